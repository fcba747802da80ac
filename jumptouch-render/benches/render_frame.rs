use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use jumptouch_core::{DrawSurface as _, Point, Rgba, Shape};
use jumptouch_render::SkiaSurface;
use jumptouch_timing::HighPrecisionTimer;
use pprof::criterion::{Output, PProfProfiler};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Background plus four targets, the shape list of a typical running frame.
fn trial_frame(flash: bool) -> Vec<Shape> {
    let bg = if flash { Rgba::WHITE } else { Rgba::GREY };
    let mut shapes = vec![Shape::rectangle(
        Point::default(),
        WIDTH as f32,
        HEIGHT as f32,
        bg,
    )];
    for i in 0..4 {
        shapes.push(Shape::circle(
            Point::new(340.0 + i as f32 * 200.0, 360.0),
            15.7,
            Rgba::BLACK,
        ));
    }
    shapes
}

pub fn bench_render_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    for (name, flash) in [("background", false), ("flash", true)] {
        g.bench_function(name, |b| {
            b.iter_batched(
                || {
                    (
                        SkiaSurface::new(WIDTH, HEIGHT).expect("canvas"),
                        vec![0u8; (WIDTH * HEIGHT * 4) as usize],
                        HighPrecisionTimer::new(),
                    )
                },
                |(mut s, mut fb, mut t)| {
                    let shapes = trial_frame(flash);
                    let stats = s.render_frame(
                        |s| {
                            s.clear();
                            for shape in &shapes {
                                shape.draw(s);
                            }
                        },
                        &mut fb,
                        &mut t,
                    );
                    black_box(stats.map(|s| s.total)).ok();
                },
                BatchSize::LargeInput,
            )
        });
    }

    g.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench_render_frame
}
criterion_main!(benches);
