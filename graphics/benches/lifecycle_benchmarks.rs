use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vista_graphics::{
    CommandStream, DummyBackend, Extent2d, FrameContext, GraphicsDevice, RenderTargetConfig,
    RenderTargetManager, RetiredResource, RetirementQueue, VersionedResource, VersionedUniform,
};

fn dummy_device(frames_in_flight: usize) -> (Arc<GraphicsDevice>, FrameContext) {
    let backend = Arc::new(DummyBackend::new().with_frames_in_flight(frames_in_flight));
    let device = GraphicsDevice::with_dummy(&backend);
    (device, FrameContext::new(frames_in_flight, 3))
}

// ---------------------------------------------------------------------------
// Versioned resources
// ---------------------------------------------------------------------------

fn bench_set_and_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("versioned_set_consume");
    for frames_in_flight in [1usize, 2, 3] {
        let (device, frames) = dummy_device(frames_in_flight);
        let mut uniform =
            VersionedUniform::<[[f32; 4]; 4]>::new(&device, &frames, "camera").unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(frames_in_flight),
            &frames,
            |b, frames| {
                let mut tick = 0usize;
                b.iter(|| {
                    uniform.update(|m| m[0][0] = tick as f32);
                    let slot = frames.slot(tick % frames.frames_in_flight());
                    black_box(uniform.consume(slot).unwrap());
                    tick += 1;
                });
            },
        );
    }
    group.finish();
}

fn bench_consume_clean(c: &mut Criterion) {
    let (device, frames) = dummy_device(2);
    let mut resource = VersionedResource::new(&device, &frames, 256, "lights").unwrap();
    for slot in frames.slots() {
        resource.consume(slot).unwrap();
    }

    c.bench_function("versioned_consume_clean", |b| {
        b.iter(|| black_box(resource.consume(frames.slot(0)).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Retirement
// ---------------------------------------------------------------------------

fn bench_retirement_tick(c: &mut Criterion) {
    let (device, frames) = dummy_device(2);
    let descriptor = vista_graphics::PipelineDescriptor::for_pass(
        "shapes",
        &RenderTargetConfig::default().render_pass_descriptor(),
    );

    c.bench_function("retirement_tick_64_pending", |b| {
        b.iter_with_setup(
            || {
                let mut queue = RetirementQueue::new(&device, &frames);
                for _ in 0..64 {
                    let pipeline = device.create_pipeline(&descriptor).unwrap();
                    queue.retire(RetiredResource::Pipeline(pipeline));
                }
                queue
            },
            |mut queue| {
                for _ in 0..queue.lifetime() {
                    black_box(queue.tick().unwrap());
                }
                queue
            },
        );
    });
}

// ---------------------------------------------------------------------------
// Render targets
// ---------------------------------------------------------------------------

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_target_rebuild");
    for sample_count in [1u32, 4] {
        let (device, frames) = dummy_device(2);
        let config = RenderTargetConfig::default().with_sample_count(sample_count);
        let mut targets =
            RenderTargetManager::new(&device, &frames, config, Extent2d::new(1280, 720)).unwrap();
        let mut queue = RetirementQueue::new(&device, &frames);

        group.bench_function(BenchmarkId::new("msaa", sample_count), |b| {
            let mut width = 1280;
            b.iter(|| {
                width = if width == 1280 { 1281 } else { 1280 };
                black_box(targets.rebuild(Extent2d::new(width, 720), &mut queue));
                queue.tick().unwrap();
            });
        });

        queue.flush_all().unwrap();
    }
    group.finish();
}

fn bench_record_frame(c: &mut Criterion) {
    let (device, frames) = dummy_device(2);
    let targets = RenderTargetManager::new(
        &device,
        &frames,
        RenderTargetConfig::default(),
        Extent2d::new(1280, 720),
    )
    .unwrap();
    let mut uniform = VersionedUniform::<[f32; 4]>::new(&device, &frames, "color").unwrap();

    c.bench_function("record_scene_pass", |b| {
        b.iter(|| {
            let slot = frames.slot(0);
            let buffer = uniform.consume(slot).unwrap();
            let mut stream = CommandStream::new(slot, 0);
            targets.begin_pass(&mut stream);
            stream.bind_uniform_buffer(0, buffer);
            stream.draw(36, 16);
            targets.end_pass(&mut stream);
            black_box(stream);
        });
    });
}

criterion_group!(versioned, bench_set_and_consume, bench_consume_clean);
criterion_group!(retirement, bench_retirement_tick);
criterion_group!(targets, bench_rebuild, bench_record_frame);
criterion_main!(versioned, retirement, targets);
