#![allow(clippy::cast_precision_loss)]
use adapt_algorithms::{
    Axis, CylinderSample, EnergyGrid, FlatteningConvention, GaussianBroadening, Reconstructor,
    VoxelTable,
};
use adapt_core::{
    BinCenters, EnergySpectrum, HistogramMetadata, RawSpectrum, RunConfig, ScoringMesh, Shape,
    VoxelDims,
};
use approx::assert_relative_eq;

fn box_run(nx: usize, ny: usize, nz: usize) -> RunConfig {
    RunConfig::new(10_000).with_mesh(ScoringMesh::Box {
        half_extents: [0.5, 0.5, 0.5],
        voxels: VoxelDims::new(nx, ny, nz),
    })
}

#[test]
fn test_box_grid_matches_scan_order() {
    let (nx, ny, nz) = (4, 3, 2);
    let config = box_run(nx, ny, nz);
    // X slowest, Z fastest
    let mut values = Vec::new();
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                values.push((x * 100 + y * 10 + z) as f64);
            }
        }
    }
    let grid = Reconstructor::for_config(&config)
        .unwrap()
        .reconstruct(&VoxelTable::Box(values), &config)
        .unwrap();
    let EnergyGrid::Box(grid) = grid else {
        panic!("expected box grid");
    };
    assert_eq!(grid.as_array().shape(), &[ny, nx, nz]);
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                let expected = (x * 100 + y * 10 + z) as f64;
                assert_eq!(grid.get(ny - 1 - y, x, z), Some(expected));
            }
        }
    }
}

#[test]
fn test_box_grid_with_z_slowest_convention() {
    let config = box_run(2, 2, 3);
    let mut values = Vec::new();
    for z in 0..3 {
        for y in 0..2 {
            for x in 0..2 {
                values.push((x * 100 + y * 10 + z) as f64);
            }
        }
    }
    let convention = FlatteningConvention::new([Axis::Z, Axis::Y, Axis::X]);
    let grid = Reconstructor::for_shape(Shape::Box)
        .with_convention(convention)
        .reconstruct(&VoxelTable::Box(values), &config)
        .unwrap();
    let EnergyGrid::Box(grid) = grid else {
        panic!("expected box grid");
    };
    // no inversion: image row equals scan row
    assert_eq!(grid.get(1, 0, 2), Some(12.0));
    assert_eq!(grid.get(0, 1, 1), Some(101.0));
}

#[test]
fn test_cylinder_layers_and_display() {
    let config = RunConfig::new(500).with_mesh(
        ScoringMesh::cylinder_from_extents(0.03, 0.01, 0.01).unwrap(),
    );
    let mut rows = Vec::new();
    for z in 0..2 {
        for phi in 0..4 {
            for r in 0..3 {
                rows.push(CylinderSample::new(
                    f64::from(z),
                    f64::from(phi),
                    f64::from(r),
                    f64::from(z * 100 + phi * 10 + r),
                ));
            }
        }
    }
    let grid = Reconstructor::for_config(&config)
        .unwrap()
        .reconstruct(&VoxelTable::Cylinder(rows), &config)
        .unwrap();
    let EnergyGrid::Cylinder(grid) = grid else {
        panic!("expected cylinder grid");
    };
    assert_eq!(grid.layer_count(), 2);
    assert_eq!(grid.layer_shape(), (3, 4));
    assert_eq!(grid.layer(1).unwrap()[[2, 3]], 132.0);

    let shown = grid.display_layer(1, 2).unwrap();
    assert_eq!(shown[[0, 3]], 0.0);
    assert_eq!(shown[[1, 3]], 0.0);
    assert_eq!(shown[[2, 3]], 132.0);

    let mesh = grid.polar_mesh();
    assert_eq!(mesh.x.shape(), &[4, 3]);
    assert_relative_eq!(mesh.r[2], 2.0);
}

#[test]
fn test_broadened_spectrum_keeps_peak_position() {
    let metadata = HistogramMetadata::new(41, 0.0, 4.1).unwrap();
    let mut raw = vec![0_u64; metadata.raw_len()];
    // bin 20 after trimming the underflow slot
    raw[21] = 1000;
    let spectrum = EnergySpectrum::from_raw(&RawSpectrum(raw));
    let centers: BinCenters = metadata.bin_centers();
    let broadened = GaussianBroadening::new(0.3)
        .unwrap()
        .broaden_spectrum(&spectrum, &centers)
        .unwrap();
    let peak = broadened
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i);
    assert_eq!(peak, Some(20));
    assert_relative_eq!(broadened[19], broadened[21], max_relative = 1e-9);
}
