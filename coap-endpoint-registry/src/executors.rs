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

//! Execution resources injected into endpoint transports.
//!
//! Transports do no work until they are given an [`EndpointExecutors`]: the
//! I/O executor drives the socket receive loop and the CPU executor fans
//! received datagrams out to subscribers.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

const COMPONENT: &str = "executor_pool";

/// Pair of runtime handles handed to a transport.
#[derive(Clone, Debug)]
pub struct EndpointExecutors {
    io: Handle,
    cpu: Handle,
}

impl EndpointExecutors {
    pub fn new(io: Handle, cpu: Handle) -> Self {
        Self { io, cpu }
    }

    /// Uses the runtime the caller is running on for both roles.
    ///
    /// Returns `None` outside of a tokio runtime.
    pub fn try_current() -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(handle.clone(), handle))
    }

    pub fn io(&self) -> &Handle {
        &self.io
    }

    pub fn cpu(&self) -> &Handle {
        &self.cpu
    }
}

/// Owns dedicated I/O and CPU runtimes for endpoint transports.
pub struct ExecutorPool {
    io_runtime: Option<Runtime>,
    cpu_runtime: Option<Runtime>,
    executors: EndpointExecutors,
}

impl ExecutorPool {
    pub fn new(name: &str, io_threads: usize, cpu_threads: usize) -> io::Result<Self> {
        let io_runtime = Self::build_runtime(&format!("{name}-io"), io_threads)?;
        let cpu_runtime = Self::build_runtime(&format!("{name}-cpu"), cpu_threads)?;
        let executors =
            EndpointExecutors::new(io_runtime.handle().clone(), cpu_runtime.handle().clone());

        debug!(
            component = COMPONENT,
            name, io_threads, cpu_threads, "executor pool started"
        );

        Ok(Self {
            io_runtime: Some(io_runtime),
            cpu_runtime: Some(cpu_runtime),
            executors,
        })
    }

    fn build_runtime(thread_prefix: &str, threads: usize) -> io::Result<Runtime> {
        let thread_prefix = thread_prefix.to_string();
        let thread_counter = Arc::new(AtomicUsize::new(0));

        Builder::new_multi_thread()
            .worker_threads(threads.max(1))
            .thread_name_fn(move || {
                let index = thread_counter.fetch_add(1, Ordering::Relaxed);
                format!("{thread_prefix}-{index}")
            })
            .enable_all()
            .build()
    }

    pub fn executors(&self) -> EndpointExecutors {
        self.executors.clone()
    }

    /// Stops both runtimes without waiting for in-flight tasks.
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(runtime) = self.io_runtime.take() {
            runtime.shutdown_background();
        }
        if let Some(runtime) = self.cpu_runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for ExecutorPool {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::{EndpointExecutors, ExecutorPool};
    use crate::observability::fields::thread_name_or_default;

    #[test]
    fn try_current_is_none_outside_runtime() {
        assert!(EndpointExecutors::try_current().is_none());
    }

    #[tokio::test]
    async fn try_current_uses_caller_runtime() {
        let executors = EndpointExecutors::try_current().expect("inside a runtime");
        let value = executors
            .io()
            .spawn(async { 7 })
            .await
            .expect("task should complete");

        assert_eq!(value, 7);
    }

    #[test]
    fn pool_threads_carry_pool_name() {
        let pool = ExecutorPool::new("pool-test", 1, 1).expect("pool should start");
        let executors = pool.executors();

        let io_thread = executors.io().block_on(async {
            tokio::spawn(async { thread_name_or_default(std::thread::current().name()) })
                .await
                .expect("io task should complete")
        });
        let cpu_thread = executors.cpu().block_on(async {
            tokio::spawn(async { thread_name_or_default(std::thread::current().name()) })
                .await
                .expect("cpu task should complete")
        });

        assert!(io_thread.starts_with("pool-test-io-"));
        assert!(cpu_thread.starts_with("pool-test-cpu-"));
        pool.shutdown();
    }
}
