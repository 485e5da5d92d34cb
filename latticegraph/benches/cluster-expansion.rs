use latticegraph::{CrystalCluster, CrystalParameters, UnitCell};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

/// Body-centered cell with two sites, and edges between all neighbors up to
/// the second shell
fn unit_cell() -> UnitCell {
    let parameters = CrystalParameters {
        cell_lengths: [4.0, 4.0, 4.0],
        cell_angles: [90.0, 90.0, 90.0],
        sites: vec![[0.0, 0.0, 0.0], [0.25, 0.0, 0.0]],
        symmetry_operations: vec![
            "x, y, z".into(),
            "-x, -y, -z".into(),
            "x+1/2, y+1/2, z+1/2".into(),
            "-x+1/2, -y+1/2, -z+1/2".into(),
        ],
        assign_different_types: true,
    };

    let unit_cell = parameters.build().expect("invalid crystal");
    let mut cluster = CrystalCluster::new(unit_cell, [2, 2, 2]).expect("invalid cluster");
    cluster.search_edges_by_dist(1, 1.0, 1.0).expect("search failed");
    cluster.search_edges_by_dist(2, 2.0, 1.0).expect("search failed");
    return cluster.unit_cell().clone();
}

fn cluster_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster expansion");
    group.noise_threshold(0.05);

    let unit_cell = unit_cell();
    for &n in black_box(&[2, 4, 8, 16]) {
        group.bench_function(format!("size = {}x{}x{}", n, n, n), |b| b.iter(|| {
            let cluster = CrystalCluster::new(unit_cell.clone(), [n, n, n]).unwrap();
            black_box(cluster);
        }));
    }
}

fn cluster_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster resize");
    group.noise_threshold(0.05);

    let mut cluster = CrystalCluster::new(unit_cell(), [2, 2, 2]).unwrap();
    for &n in black_box(&[2, 4, 8, 16]) {
        group.bench_function(format!("size = {}x{}x{}", n, n, n), |b| b.iter(|| {
            cluster.reset_size([n, n, n]).unwrap();
        }));
    }
}

criterion_group!(benches, cluster_expansion, cluster_resize);
criterion_main!(benches);
