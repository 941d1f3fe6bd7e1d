/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! UDP socket transport shared by the UDP, multicast and DTLS builders.

use crate::error::TransportError;
use crate::executors::EndpointExecutors;
use crate::interceptor::{MessageInterceptor, TrafficDirection, TrafficRecord};
use crate::observability::{events, fields};
use crate::transport::dtls::DtlsCredentials;
use crate::transport::{CoapTransport, InboundDatagram};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMPONENT: &str = "datagram_transport";
const MAX_DATAGRAM_SIZE: usize = 65_507;
const INBOUND_QUEUE_SIZE: usize = 256;

type InterceptorChain = Arc<RwLock<Vec<Arc<dyn MessageInterceptor>>>>;

/// Bound UDP socket with a receive loop started on injected executors.
pub struct DatagramTransport {
    endpoint_name: String,
    socket: Mutex<Option<Arc<UdpSocket>>>,
    local_addr: SocketAddr,
    credentials: Option<DtlsCredentials>,
    interceptors: InterceptorChain,
    inbound: broadcast::Sender<InboundDatagram>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    executors_set: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for DatagramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramTransport")
            .field("endpoint_name", &self.endpoint_name)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl DatagramTransport {
    pub(crate) fn new(
        endpoint_name: String,
        socket: UdpSocket,
        credentials: Option<DtlsCredentials>,
    ) -> io::Result<Self> {
        let local_addr = socket.local_addr()?;
        let (inbound, _) = broadcast::channel(INBOUND_QUEUE_SIZE);

        debug!(
            event = events::TRANSPORT_BIND_OK,
            component = COMPONENT,
            endpoint_name = %endpoint_name,
            local_addr = %local_addr,
            "datagram socket bound"
        );

        Ok(Self {
            endpoint_name,
            socket: Mutex::new(Some(Arc::new(socket))),
            local_addr,
            credentials,
            interceptors: Arc::new(RwLock::new(Vec::new())),
            inbound,
            tasks: Mutex::new(Vec::new()),
            executors_set: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    /// DTLS credentials carried by the endpoint, if it was built as DTLS.
    pub fn credentials(&self) -> Option<&DtlsCredentials> {
        self.credentials.as_ref()
    }

    fn socket(&self) -> Option<Arc<UdpSocket>> {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Aborts `tasks` and waits until each one has dropped its socket handle.
    async fn stop_tasks(tasks: Vec<JoinHandle<()>>) {
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    fn spawn_loops(&self, socket: Arc<UdpSocket>, executors: &EndpointExecutors) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);
        let receive_task = executors.io().spawn(Self::receive_loop(
            self.endpoint_name.clone(),
            socket,
            dispatch_tx,
        ));
        let dispatch_task = executors.cpu().spawn(Self::dispatch_loop(
            self.endpoint_name.clone(),
            self.interceptors.clone(),
            self.inbound.clone(),
            dispatch_rx,
        ));

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(receive_task);
        tasks.push(dispatch_task);
    }

    fn notify(
        interceptors: &InterceptorChain,
        endpoint_name: &str,
        direction: TrafficDirection,
        peer: SocketAddr,
        datagram: &[u8],
    ) {
        let chain = interceptors.read().unwrap_or_else(PoisonError::into_inner);
        if chain.is_empty() {
            return;
        }
        let record = TrafficRecord {
            endpoint_name,
            direction,
            peer,
            datagram,
        };
        for interceptor in chain.iter() {
            match direction {
                TrafficDirection::Inbound => interceptor.on_receive(&record),
                TrafficDirection::Outbound => interceptor.on_send(&record),
            }
        }
    }

    async fn receive_loop(
        endpoint_name: String,
        socket: Arc<UdpSocket>,
        dispatch: mpsc::Sender<InboundDatagram>,
    ) {
        debug!(
            event = events::TRANSPORT_RECV_LOOP_START,
            component = COMPONENT,
            endpoint_name = %endpoint_name,
            worker_thread = %fields::thread_name_or_default(std::thread::current().name()),
            "receive loop started"
        );

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, peer)) => {
                    let datagram = InboundDatagram {
                        peer,
                        payload: Arc::from(&buffer[..len]),
                    };
                    if dispatch.send(datagram).await.is_err() {
                        break;
                    }
                }
                // ICMP port-unreachable from an earlier send surfaces here on some platforms.
                Err(err) if err.kind() == io::ErrorKind::ConnectionReset => {
                    debug!(
                        event = events::TRANSPORT_RECV_FAILED,
                        component = COMPONENT,
                        endpoint_name = %endpoint_name,
                        err = %err,
                        "ignoring connection reset"
                    );
                }
                Err(err) => {
                    warn!(
                        event = events::TRANSPORT_RECV_FAILED,
                        component = COMPONENT,
                        endpoint_name = %endpoint_name,
                        err = %err,
                        "receive loop stopped"
                    );
                    break;
                }
            }
        }
    }

    async fn dispatch_loop(
        endpoint_name: String,
        interceptors: InterceptorChain,
        inbound: broadcast::Sender<InboundDatagram>,
        mut received: mpsc::Receiver<InboundDatagram>,
    ) {
        while let Some(datagram) = received.recv().await {
            Self::notify(
                &interceptors,
                &endpoint_name,
                TrafficDirection::Inbound,
                datagram.peer,
                &datagram.payload,
            );
            // No subscriber is not an error; the datagram is dropped.
            let _ = inbound.send(datagram);
        }
    }
}

#[async_trait]
impl CoapTransport for DatagramTransport {
    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }

    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let Some(socket) = self.socket() else {
            return Err(TransportError::Closed);
        };

        Self::notify(
            &self.interceptors,
            &self.endpoint_name,
            TrafficDirection::Outbound,
            peer,
            datagram,
        );
        socket.send_to(datagram, peer).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundDatagram> {
        self.inbound.subscribe()
    }

    fn add_interceptor(&self, interceptor: Arc<dyn MessageInterceptor>) {
        self.interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(interceptor);
    }

    fn set_executors(&self, executors: &EndpointExecutors) -> bool {
        if self.is_closed() || self.executors_set.swap(true, Ordering::SeqCst) {
            return false;
        }
        let Some(socket) = self.socket() else {
            return false;
        };

        self.spawn_loops(socket, executors);
        true
    }

    async fn rebind_executors(&self, executors: &EndpointExecutors) -> bool {
        if self.is_closed() {
            return false;
        }

        Self::stop_tasks(self.take_tasks()).await;
        let Some(socket) = self.socket() else {
            return false;
        };
        self.executors_set.store(true, Ordering::SeqCst);
        self.spawn_loops(socket, executors);

        debug!(
            event = events::TRANSPORT_REBIND,
            component = COMPONENT,
            endpoint_name = %self.endpoint_name,
            "receive loop moved to new executors"
        );
        true
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn destroy(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let socket = self
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Self::stop_tasks(self.take_tasks()).await;
        drop(socket);

        info!(
            event = events::TRANSPORT_CLOSED,
            component = COMPONENT,
            endpoint_name = %self.endpoint_name,
            local_addr = %self.local_addr,
            "transport closed"
        );
    }
}

impl Drop for DatagramTransport {
    fn drop(&mut self) {
        for task in self
            .tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DatagramTransport;
    use crate::error::TransportError;
    use crate::executors::{EndpointExecutors, ExecutorPool};
    use crate::interceptor::{MessageInterceptor, TrafficDirection, TrafficRecord};
    use crate::transport::CoapTransport;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    #[derive(Default)]
    struct RecordingInterceptor {
        seen: Mutex<Vec<(TrafficDirection, Vec<u8>)>>,
    }

    impl MessageInterceptor for RecordingInterceptor {
        fn on_send(&self, record: &TrafficRecord<'_>) {
            self.seen
                .lock()
                .expect("lock")
                .push((record.direction, record.datagram.to_vec()));
        }

        fn on_receive(&self, record: &TrafficRecord<'_>) {
            self.seen
                .lock()
                .expect("lock")
                .push((record.direction, record.datagram.to_vec()));
        }
    }

    async fn bind_transport(name: &str) -> DatagramTransport {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("socket should bind");
        DatagramTransport::new(name.to_string(), socket, None).expect("transport should build")
    }

    #[tokio::test]
    async fn receives_only_after_executors_are_set() {
        let receiver = bind_transport("receiver").await;
        let sender = bind_transport("sender").await;
        let mut inbound = receiver.subscribe();
        let executors = EndpointExecutors::try_current().expect("inside a runtime");

        assert!(receiver.set_executors(&executors));
        assert!(!receiver.set_executors(&executors));

        let target = receiver.local_addr().expect("bound address");
        sender
            .send_to(b"ping", target)
            .await
            .expect("send should succeed");

        let datagram = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
            .await
            .expect("datagram should arrive")
            .expect("channel should stay open");
        assert_eq!(&*datagram.payload, b"ping");
        assert_eq!(Some(datagram.peer), sender.local_addr());
    }

    #[tokio::test]
    async fn interceptors_see_both_directions() {
        let receiver = bind_transport("receiver").await;
        let sender = bind_transport("sender").await;
        let recorder = Arc::new(RecordingInterceptor::default());
        receiver.add_interceptor(recorder.clone());
        sender.add_interceptor(recorder.clone());
        let mut inbound = receiver.subscribe();
        receiver.set_executors(&EndpointExecutors::try_current().expect("inside a runtime"));

        sender
            .send_to(b"hello", receiver.local_addr().expect("bound address"))
            .await
            .expect("send should succeed");
        tokio::time::timeout(Duration::from_secs(5), inbound.recv())
            .await
            .expect("datagram should arrive")
            .expect("channel should stay open");

        let seen = recorder.seen.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![
                (TrafficDirection::Outbound, b"hello".to_vec()),
                (TrafficDirection::Inbound, b"hello".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn destroyed_transport_rejects_sends_and_executors() {
        let transport = bind_transport("closing").await;
        let peer = transport.local_addr().expect("bound address");

        transport.destroy().await;
        transport.destroy().await;

        assert!(transport.is_closed());
        assert!(matches!(
            transport.send_to(b"late", peer).await,
            Err(TransportError::Closed)
        ));
        assert!(!transport.set_executors(&EndpointExecutors::try_current().expect("runtime")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn destroy_releases_the_bound_port() {
        let transport = bind_transport("fixed").await;
        let addr = transport.local_addr().expect("bound address");
        transport.set_executors(&EndpointExecutors::try_current().expect("inside a runtime"));

        transport.destroy().await;

        let rebound = UdpSocket::bind(addr).await;
        assert!(rebound.is_ok(), "port should be free after destroy: {rebound:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rebind_keeps_receiving_after_old_executors_stop() {
        let receiver = bind_transport("receiver").await;
        let sender = bind_transport("sender").await;
        let mut inbound = receiver.subscribe();

        let pool = ExecutorPool::new("short-lived", 1, 1).expect("pool should start");
        assert!(receiver.set_executors(&pool.executors()));
        assert!(
            receiver
                .rebind_executors(&EndpointExecutors::try_current().expect("inside a runtime"))
                .await
        );
        pool.shutdown();

        sender
            .send_to(b"still here", receiver.local_addr().expect("bound address"))
            .await
            .expect("send should succeed");
        let datagram = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
            .await
            .expect("datagram should arrive")
            .expect("channel should stay open");
        assert_eq!(&*datagram.payload, b"still here");

        receiver.destroy().await;
        assert!(
            !receiver
                .rebind_executors(&EndpointExecutors::try_current().expect("inside a runtime"))
                .await
        );
    }
}
