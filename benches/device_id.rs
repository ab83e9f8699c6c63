//! Benchmarks for the device id codec and registry lookups

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use media_storage_util::{
    crack_device_id, is_media_device, make_device_id, DeviceRegistry, DeviceType,
    InMemoryDeviceRegistry, RemovableStorageInfo,
};
use std::path::Path;

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_id");
    group.throughput(Throughput::Elements(1));

    group.bench_function("make_device_id", |b| {
        b.iter(|| make_device_id(black_box(DeviceType::RemovableMassStorageNoDcim), black_box("UUID:1234-ABCD")));
    });

    group.bench_function("crack_device_id", |b| {
        b.iter(|| crack_device_id(black_box("nodcim:UUID:1234-ABCD")));
    });

    group.bench_function("is_media_device", |b| {
        b.iter(|| is_media_device(black_box("mtp:usb:2,5")));
    });

    group.finish();
}

fn bench_registry_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_registry");
    group.throughput(Throughput::Elements(1));

    // Pre-attach devices
    let registry = InMemoryDeviceRegistry::new();
    for i in 0..64 {
        let _ = registry.attach(RemovableStorageInfo::new(
            make_device_id(DeviceType::RemovableMassStorageWithDcim, &format!("UUID:{:04}", i)),
            format!("CARD{}", i),
            format!("/media/card{}", i),
        ));
    }

    group.bench_function("find_location_by_id", |b| {
        b.iter(|| registry.find_location_by_id(black_box("dcim:UUID:0042")));
    });

    group.bench_function("device_info_for_path", |b| {
        b.iter(|| registry.device_info_for_path(black_box(Path::new("/media/card42/DCIM/100/a.jpg"))));
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_registry_lookup);
criterion_main!(benches);
