use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::time::{Duration, Instant};

use artnet_bridge::config::AppConfig;
use artnet_bridge::dmx::{BusId, BusSet, VirtualBus};
use artnet_bridge::network::MemoryTransport;
use artnet_bridge::protocol::{ArtDmx, PortAddress};
use artnet_bridge::Node;

fn node(buses: u16) -> Node<MemoryTransport, BusSet> {
    let mut source = String::new();
    for id in 1..=buses {
        source.push_str(&format!(
            "[[routes]]\nbus = {}\nuniverse = {}\ndirection = \"to_dmx\"\n\n",
            id,
            id % 4
        ));
    }
    let config = AppConfig::from_toml_str(&source).unwrap();

    let mut set = BusSet::new();
    for id in 1..=buses {
        set.insert(BusId(id), VirtualBus::new(BusId(id)));
    }
    Node::new(&config, MemoryTransport::new(), set).unwrap()
}

fn dispatch_benchmark(c: &mut Criterion) {
    let data = [128u8; 512];
    let packet = ArtDmx::new(PortAddress::new(0, 0, 1), 1, &data).encode();

    let mut group = c.benchmark_group("Dispatch");

    group.bench_function("decode_artdmx", |b| {
        b.iter(|| ArtDmx::decode(black_box(&packet)))
    });

    group.bench_function("encode_artdmx", |b| {
        let frame = ArtDmx::new(PortAddress::new(0, 0, 1), 1, &data);
        b.iter(|| black_box(&frame).encode())
    });

    let mut fan_out = node(16);
    group.bench_function("handle_packet_fan_out_16", |b| {
        b.iter(|| fan_out.handle_packet(black_box(&packet)))
    });

    group.finish();
}

fn flush_benchmark(c: &mut Criterion) {
    let mut config = AppConfig::from_toml_str(
        r#"
        [[routes]]
        bus = 1
        universe = 0
        direction = "to_artnet"
        "#,
    )
    .unwrap();
    config.output.continuous = true;

    let mut set = BusSet::new();
    set.insert(BusId(1), VirtualBus::new(BusId(1)));
    let mut node = Node::new(&config, MemoryTransport::new(), set).unwrap();

    let start = Instant::now();
    node.start(start);
    let mut ms = 0u64;

    c.bench_function("continuous_tick", |b| {
        b.iter(|| {
            ms += 100;
            node.tick(start + Duration::from_millis(ms));
            node.transport_mut().take();
        })
    });
}

criterion_group!(benches, dispatch_benchmark, flush_benchmark);
criterion_main!(benches);
