use coap_endpoint_registry::{
    ClientHandle, CoapHeaderSummary, EndpointConfig, EndpointRegistry, ServerHandle,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use integration_test_utils::confirmable_get;
use std::net::IpAddr;
use tokio::runtime::Builder;

const LOOKUP_ENDPOINTS: usize = 64;

fn loopback(config_name: &str) -> EndpointConfig {
    EndpointConfig::udp(config_name, IpAddr::from([127, 0, 0, 1]), 0)
}

fn registry_criterion(c: &mut Criterion) {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("benchmark runtime should build");

    let registry = EndpointRegistry::with_default_factory();
    let server = ServerHandle::new("bench-server");
    let config = loopback("shared");
    runtime
        .block_on(registry.get_or_create_for_server(&server, &config))
        .expect("shared endpoint should build");

    let mut sharing_group = c.benchmark_group("endpoint_sharing");
    sharing_group.bench_function("client_attach_detach", |b| {
        b.iter(|| {
            let client = ClientHandle::new("bench-client");
            let endpoint = runtime
                .block_on(registry.get_or_create_for_client(Some(&client), &config))
                .expect("client should reuse the endpoint");
            runtime.block_on(registry.dispose_client(&client));
            black_box(endpoint);
        });
    });
    sharing_group.bench_function("server_conflict", |b| {
        let intruder = ServerHandle::new("bench-intruder");
        b.iter(|| {
            let result = runtime.block_on(registry.get_or_create_for_server(&intruder, &config));
            assert!(result.is_err(), "second server must be refused");
            black_box(result.is_err());
        });
    });
    sharing_group.finish();

    let lookup_client = ClientHandle::new("lookup-client");
    runtime.block_on(async {
        for index in 0..LOOKUP_ENDPOINTS {
            registry
                .get_or_create_for_client(Some(&lookup_client), &loopback(&format!("ep-{index}")))
                .await
                .expect("lookup endpoint should build");
        }
    });

    let mut lookup_group = c.benchmark_group("registry_lookup");
    lookup_group.bench_function("find_by_client", |b| {
        b.iter(|| {
            let names = runtime.block_on(registry.find_by_client(&lookup_client));
            black_box(names.len());
        });
    });
    lookup_group.bench_function("find_by_server", |b| {
        b.iter(|| {
            let names = runtime.block_on(registry.find_by_server(&server));
            black_box(names.len());
        });
    });
    lookup_group.finish();

    let mut lifecycle_group = c.benchmark_group("endpoint_lifecycle");
    lifecycle_group.bench_function("udp_create_destroy", |b| {
        b.iter_batched(
            || ClientHandle::new("lifecycle-client"),
            |client| {
                runtime
                    .block_on(registry.get_or_create_for_client(Some(&client), &loopback("short")))
                    .expect("endpoint should build");
                runtime.block_on(registry.dispose_client(&client));
            },
            BatchSize::SmallInput,
        );
    });
    lifecycle_group.finish();

    let datagram = confirmable_get(0x1234, &[0xde, 0xad, 0xbe, 0xef]);
    let mut header_group = c.benchmark_group("traffic_tracing");
    header_group.bench_function("header_summary", |b| {
        b.iter(|| black_box(CoapHeaderSummary::parse(black_box(&datagram))));
    });
    header_group.finish();

    runtime.block_on(registry.shutdown());
}

criterion_group!(benches, registry_criterion);
criterion_main!(benches);
