//! GPU integration tests for the ripple field.
//!
//! These run against a headless device and skip (with a message) on hosts
//! without a usable adapter. The field is forced to `Rgba32Float` so texels
//! read back as plain `f32`.

use ripplefield::config::RippleConfig;
use ripplefield::gpu::GpuContext;
use ripplefield::sim::RippleSimulation;

const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

fn gpu() -> Option<GpuContext> {
    let ctx = GpuContext::headless()?;
    if !ctx.supports_field_format(FIELD_FORMAT) {
        eprintln!("adapter cannot render to Rgba32Float, skipping");
        return None;
    }
    Some(ctx)
}

fn test_sim(ctx: &GpuContext, width: u32, height: u32) -> RippleSimulation {
    let config = RippleConfig {
        grid_width: width,
        grid_height: height,
        ..Default::default()
    };
    RippleSimulation::with_format(ctx, &config, FIELD_FORMAT).expect("simulation construction")
}

fn sum_red(texels: &[[f32; 4]]) -> f64 {
    texels.iter().map(|t| t[0] as f64).sum()
}

fn max_red(texels: &[[f32; 4]]) -> f32 {
    texels.iter().map(|t| t[0]).fold(f32::MIN, f32::max)
}

#[test]
fn flat_field_is_a_fixed_point() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let mut sim = test_sim(&ctx, 8, 8);

    for _ in 0..3 {
        sim.tick(&ctx);
    }

    let texels = sim.read_field(&ctx).unwrap();
    for (i, texel) in texels.iter().enumerate() {
        for channel in texel {
            assert!(
                channel.abs() < 1e-7,
                "texel {i} drifted from zero: {texel:?}"
            );
        }
    }
}

#[test]
fn every_pass_swaps_the_read_target() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let mut sim = test_sim(&ctx, 8, 8);

    // Querying without a pass is stable.
    let before = sim.read_index();
    assert_eq!(before, sim.read_index());

    // A drop-free tick is one diffusion pass: one swap.
    sim.tick(&ctx);
    let after_one_pass = sim.read_index();
    assert_ne!(before, after_one_pass);

    // Diffusion plus one drop is two passes: back to the same target. Odd and
    // even pass counts per tick are both legitimate.
    sim.add_drop(0.0, 0.0, 0.1, 0.05);
    sim.tick(&ctx);
    assert_eq!(after_one_pass, sim.read_index());
}

#[test]
fn non_positive_radius_drops_are_rejected() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let mut sim = test_sim(&ctx, 8, 8);

    sim.add_drop(0.0, 0.0, 0.0, 0.05);
    sim.add_drop(0.0, 0.0, -0.5, 0.05);
    assert_eq!(sim.pending_drops(), 0);

    sim.tick(&ctx);
    let texels = sim.read_field(&ctx).unwrap();
    assert!(max_red(&texels) < 1e-7, "rejected drops must not disturb the field");
}

#[test]
fn drop_affects_only_texels_inside_its_radius() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let size = 64u32;
    let radius = 0.1f32;
    let strength = 0.5f32;
    let mut sim = test_sim(&ctx, size, size);

    // Diffusion on the all-zero field is a no-op, so after this tick the
    // field holds exactly one drop.
    sim.add_drop(0.0, 0.0, radius, strength);
    sim.tick(&ctx);

    let texels = sim.read_field(&ctx).unwrap();
    for y in 0..size {
        for x in 0..size {
            let texel = texels[(y * size + x) as usize];
            let u = x as f32 / size as f32;
            let v = y as f32 / size as f32;
            let dist = ((u - 0.5).powi(2) + (v - 0.5).powi(2)).sqrt();
            if dist >= radius + 1e-3 {
                assert!(
                    texel[0].abs() < 1e-6,
                    "texel ({x},{y}) at distance {dist} was disturbed: {}",
                    texel[0]
                );
            }
            // Untouched channels pass through unchanged.
            assert!(texel[1].abs() < 1e-6);
            assert!(texel[2].abs() < 1e-6);
        }
    }

    // The center texel sees the falloff peak: 0.5 - cos(pi) * 0.5 = 1.
    let center = texels[(size / 2 * size + size / 2) as usize];
    assert!(
        (center[0] - strength).abs() < 1e-3,
        "center texel should gain ~{strength}, got {}",
        center[0]
    );
}

#[test]
fn small_grid_drop_scenario() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let mut sim = test_sim(&ctx, 4, 4);

    sim.add_drop(0.0, 0.0, 0.05, 0.05);
    sim.tick(&ctx);

    let texels = sim.read_field(&ctx).unwrap();
    // Only the texel whose UV is exactly (0.5, 0.5) lies within the tiny
    // radius; it gains strength * falloff(0) = 0.05.
    for (i, texel) in texels.iter().enumerate() {
        if i == 2 * 4 + 2 {
            assert!(
                (texel[0] - 0.05).abs() < 1e-3,
                "nearest texel should gain ~0.05, got {}",
                texel[0]
            );
        } else {
            assert!(
                texel[0].abs() < 1e-6,
                "texel {i} outside the radius changed: {}",
                texel[0]
            );
        }
    }
}

#[test]
fn ripples_spread_and_amplitude_decays() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let mut sim = test_sim(&ctx, 32, 32);

    sim.add_drop(0.0, 0.0, 0.3, 0.5);
    sim.tick(&ctx);

    let initial = sim.read_field(&ctx).unwrap();
    let initial_sum = sum_red(&initial);
    let initial_peak = max_red(&initial);
    assert!(initial_sum > 0.0);

    // Drop-free ticks: total energy never grows, the peak flattens out, and
    // the velocity channel dies off with the decay factor.
    let mut prev_sum = initial_sum;
    for _ in 0..100 {
        sim.tick(&ctx);
        let texels = sim.read_field(&ctx).unwrap();
        let sum = sum_red(&texels);
        assert!(
            sum <= prev_sum + 1e-3,
            "red sum grew from {prev_sum} to {sum}"
        );
        prev_sum = sum;
    }

    let settled = sim.read_field(&ctx).unwrap();
    let peak = max_red(&settled);
    assert!(
        peak < initial_peak * 0.5,
        "peak should flatten: initial {initial_peak}, settled {peak}"
    );

    let max_green = settled
        .iter()
        .map(|t| t[1].abs())
        .fold(0.0f32, f32::max);
    assert!(max_green < 0.05, "velocity channel should decay, got {max_green}");
}

#[test]
fn format_selection_prefers_floating_point() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let format = ctx.pick_field_format().unwrap();
    assert!(ctx.supports_field_format(format));
    assert!(matches!(
        format,
        wgpu::TextureFormat::Rgba16Float
            | wgpu::TextureFormat::Rgba32Float
            | wgpu::TextureFormat::Rgba8Unorm
    ));
}

#[test]
fn invalid_resolution_fails_at_construction() {
    let Some(ctx) = gpu() else {
        eprintln!("no GPU adapter available, skipping");
        return;
    };
    let config = RippleConfig {
        grid_width: 0,
        ..Default::default()
    };
    assert!(RippleSimulation::with_format(&ctx, &config, FIELD_FORMAT).is_err());
}
