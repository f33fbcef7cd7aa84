use image::{DynamicImage, Rgb, Rgb32FImage};

const WIDTH: u32 = 512;
const HEIGHT: u32 = 256;

/// Procedural equirectangular sky used when no skybox file is given.
///
/// Linear radiance: horizon haze, blue zenith, dark ground and a bright sun
/// disc well above 1.0 so reflections pick it up.
pub fn procedural_sky() -> DynamicImage {
    let sun = sun_direction();
    let img = Rgb32FImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let dir = texel_direction(x, y);
        Rgb(radiance(dir, sun))
    });
    DynamicImage::ImageRgb32F(img)
}

fn sun_direction() -> [f32; 3] {
    normalize([-0.4, 0.8, -0.3])
}

/// Inverse of the trace program's lookup: u = atan2(x, -z) / 2pi, v = acos(y) / pi.
fn texel_direction(x: u32, y: u32) -> [f32; 3] {
    use std::f32::consts::PI;
    let u = (x as f32 + 0.5) / WIDTH as f32;
    let v = (y as f32 + 0.5) / HEIGHT as f32;
    let phi = u * 2.0 * PI;
    let theta = v * PI;
    [theta.sin() * phi.sin(), theta.cos(), -theta.sin() * phi.cos()]
}

fn radiance(dir: [f32; 3], sun: [f32; 3]) -> [f32; 3] {
    let up = dir[1];
    let base = if up >= 0.0 {
        let t = up.powf(0.5);
        lerp([0.85, 0.9, 1.0], [0.25, 0.45, 0.85], t)
    } else {
        lerp([0.35, 0.32, 0.3], [0.08, 0.07, 0.06], (-up).min(1.0))
    };

    let cos_sun = dir[0] * sun[0] + dir[1] * sun[1] + dir[2] * sun[2];
    let glow = cos_sun.max(0.0).powf(256.0) * 20.0;
    [base[0] + glow, base[1] + glow * 0.95, base[2] + glow * 0.85]
}

fn lerp(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}
