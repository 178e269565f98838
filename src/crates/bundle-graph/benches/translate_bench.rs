use bundle_graph::descriptor::{BundleDescriptor, CoderSpec, PTransform};
use bundle_graph::payload::{encode_fn, encode_port, DecodedFn, InboundDecl};
use bundle_graph::{
    topological_sort, urn, ConsumerLookup, FullType, InputKind, Opcode, TranslateConfig,
    Translator, UserFn,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn pardo(name: &str) -> Vec<u8> {
    encode_fn(&DecodedFn {
        opcode: Opcode::ParDo,
        function: UserFn {
            name: name.to_string(),
            payload: vec![],
        },
        inbound: vec![InboundDecl {
            kind: InputKind::Main,
            element_type: FullType::Bytes,
        }],
        outbound: vec![FullType::Bytes],
    })
}

/// source → `len` chained ParDos → sink
fn chain(len: usize) -> BundleDescriptor {
    let mut builder = BundleDescriptor::builder("chain")
        .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
        .pcollection("pc0", "bytes")
        .transform(
            "source",
            PTransform::new(urn::DATA_SOURCE, encode_port("localhost:1")).with_output("o", "pc0"),
        );
    for i in 0..len {
        let output = format!("pc{}", i + 1);
        builder = builder.pcollection(output.clone(), "bytes").transform(
            format!("step{:05}", i),
            PTransform::new(urn::LEGACY_DOFN, pardo("step"))
                .with_input("i", format!("pc{}", i))
                .with_output("o", output),
        );
    }
    builder
        .transform(
            "sink",
            PTransform::new(urn::DATA_SINK, encode_port("localhost:1"))
                .with_input("i", format!("pc{}", len)),
        )
        .build()
}

/// One source feeding `width` independent ParDo → sink branches
fn fan_out(width: usize) -> BundleDescriptor {
    let mut builder = BundleDescriptor::builder("fan-out")
        .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
        .pcollection("root", "bytes")
        .transform(
            "source",
            PTransform::new(urn::DATA_SOURCE, encode_port("localhost:1")).with_output("o", "root"),
        );
    for i in 0..width {
        let branch = format!("branch{}", i);
        builder = builder
            .pcollection(branch.clone(), "bytes")
            .transform(
                format!("map{:05}", i),
                PTransform::new(urn::LEGACY_DOFN, pardo("map"))
                    .with_input("i", "root")
                    .with_output("o", branch.clone()),
            )
            .transform(
                format!("sink{:05}", i),
                PTransform::new(urn::DATA_SINK, encode_port("localhost:1")).with_input("i", branch),
            );
    }
    builder.build()
}

fn sort_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological sort");
    for size in [16, 128, 512] {
        let descriptor = chain(size);
        for lookup in [ConsumerLookup::Scan, ConsumerLookup::Indexed] {
            group.bench_with_input(
                BenchmarkId::new(format!("chain/{:?}", lookup), size),
                &descriptor,
                |b, descriptor| b.iter(|| topological_sort(black_box(descriptor), lookup).unwrap()),
            );
        }
    }
    group.finish();
}

fn translate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    for size in [16, 128, 512] {
        let descriptor = fan_out(size);
        for lookup in [ConsumerLookup::Scan, ConsumerLookup::Indexed] {
            let translator =
                Translator::with_config(TranslateConfig::default().with_consumer_lookup(lookup));
            group.bench_with_input(
                BenchmarkId::new(format!("fan-out/{:?}", lookup), size),
                &descriptor,
                |b, descriptor| b.iter(|| translator.translate(black_box(descriptor)).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, sort_benchmark, translate_benchmark);
criterion_main!(benches);
