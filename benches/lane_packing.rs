use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fiberlane::{
    BatchReactionStep, FiberAddressMap, FiberData, Heun, LaneBatchPacker, MeshPartition1D, PointBuffer, RhsKernel,
    TransferChannels, TransferOptions,
};
use rand::Rng;

struct Decay;

impl<const W: usize> RhsKernel<f64, W> for Decay {
    fn n_states(&self) -> usize { 2 }
    fn n_intermediates(&self) -> usize { 1 }
    fn initial_states(&self) -> Vec<f64> { vec![0.0, 1.0] }
    fn evaluate(&self, _t: f64, states: &[[f64; W]], rates: &mut [[f64; W]], intermediates: &mut [[f64; W]]) {
        for lane in 0..W {
            rates[0][lane] = states[1][lane] - states[0][lane];
            rates[1][lane] = -0.1 * states[1][lane];
            intermediates[0][lane] = rates[0][lane];
        }
    }
}

fn bench_width<const W: usize>(c: &mut Criterion, name: &str) {
    let partitions: Vec<MeshPartition1D> = (0..64).map(|f| MeshPartition1D::uniform(1480 + f, 1).unwrap()).collect();
    let map = FiberAddressMap::new(0, 1, partitions.iter().enumerate()).unwrap();
    let options = TransferOptions { states_for_transfer: vec![0, 1], intermediates_for_transfer: vec![0] };
    let channels = TransferChannels::from_options(&options, 2, 1).unwrap();
    let mut rng = rand::thread_rng();
    let mut fiber_data = FiberData::allocate_owned(&map);
    for data in &mut fiber_data {
        data.values.iter_mut().for_each(|v| *v = rng.gen_range(-80.0..40.0));
    }
    let mut buffers: Vec<PointBuffer<f64, W>> = LaneBatchPacker::<W>::allocate(&map, &[0.0, 1.0], 1);
    let mut heun = Heun::new(Decay);

    c.bench_function(&format!("pack and unpack, {}", name), |b| {
        b.iter(|| {
            LaneBatchPacker::<W>::scatter_into_lanes(&map, black_box(&fiber_data), 0, &mut buffers).unwrap();
            LaneBatchPacker::<W>::gather_from_lanes(&map, &buffers, &channels, black_box(&mut fiber_data)).unwrap();
        })
    });

    c.bench_function(&format!("heun step, {}", name), |b| {
        b.iter(|| heun.advance(black_box(&mut buffers), 0.0, 1e-3, 5).unwrap())
    });
}

fn bench_lane_packing(c: &mut Criterion) {
    #[cfg(feature = "rayon")]
    fiberlane::reaction::init_thread_pool(None);
    bench_width::<4>(c, "4 lanes");
    bench_width::<8>(c, "8 lanes");
}

criterion_group!(benches, bench_lane_packing);
criterion_main!(benches);
