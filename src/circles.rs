//! Circular-symbol detection by gradient radial-symmetry voting.
//!
//! Pole/FAT/FDT glyphs are drawn as circles, so every strong-gradient pixel
//! casts votes along its gradient direction at distances in
//! [min_radius, max_radius]. Circle boundaries converge on their centers,
//! producing accumulator peaks that survive smoothing and non-maximum
//! suppression. A second pass estimates each peak's radius from the distance
//! distribution of supporting edge pixels.

use float_ord::FloatOrd;
use image::GrayImage;
use tracing::instrument;

use crate::CandidateSymbol;

/// Detector tuning. All lengths are in pixels of the input raster.
#[derive(Debug, Clone, Copy)]
pub struct CircleParams {
    /// Minimum distance between accepted centers (suppression radius).
    pub min_dist: f32,
    /// Minimum glyph radius considered.
    pub min_radius: f32,
    /// Maximum glyph radius considered.
    pub max_radius: f32,
    /// Edge strictness: fraction of the maximum gradient magnitude a pixel
    /// needs to cast votes.
    pub grad_threshold: f32,
    /// Accumulator strictness: fraction of the accumulator maximum a peak
    /// needs to be accepted.
    pub vote_threshold: f32,
    /// Gaussian sigma for accumulator smoothing.
    pub accum_sigma: f32,
}

impl CircleParams {
    /// DPI the reference tuning was calibrated at.
    pub const REFERENCE_DPI: u32 = 300;

    /// Scales the 300-DPI reference profile (center spacing 30 px, radii
    /// 5–40 px) linearly with resolution, with floors so coarse scans stay
    /// detectable. This replaces per-resolution hardcoded parameter sets.
    pub fn for_dpi(dpi: u32) -> Self {
        let s = dpi as f32 / Self::REFERENCE_DPI as f32;
        Self {
            min_dist: (30.0 * s).max(8.0),
            min_radius: (5.0 * s).max(2.0),
            max_radius: (40.0 * s).max(8.0),
            grad_threshold: 0.2,
            vote_threshold: 0.25,
            accum_sigma: 2.0,
        }
    }
}

impl Default for CircleParams {
    fn default() -> Self {
        Self::for_dpi(Self::REFERENCE_DPI)
    }
}

struct EdgePixel {
    x: f32,
    y: f32,
    mag: f32,
}

/// Deposit a vote into the accumulator with bilinear splatting.
#[inline]
fn bilinear_add(accum: &mut [f32], w: u32, x: f32, y: f32, weight: f32) {
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w {
        return;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let stride = w as usize;
    let base = y0 as usize * stride + x0 as usize;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Detects circular glyphs in the grayscale raster.
///
/// Returns candidates sorted by vote score (highest first); an image with no
/// edges or no qualifying peaks yields an empty vec, never an error.
#[instrument(level = "debug", skip(gray))]
pub fn find_circles(gray: &GrayImage, params: &CircleParams) -> Vec<CandidateSymbol> {
    let (w, h) = gray.dimensions();
    if w < 4 || h < 4 {
        return Vec::new();
    }

    let gx = imageproc::gradients::horizontal_scharr(gray);
    let gy = imageproc::gradients::vertical_scharr(gray);

    let mut max_mag_sq: f32 = 0.0;
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            max_mag_sq = max_mag_sq.max(gxv * gxv + gyv * gyv);
        }
    }
    let max_mag = max_mag_sq.sqrt();
    if max_mag < 1e-6 {
        return Vec::new();
    }
    let threshold = params.grad_threshold * max_mag;

    let mut edges = Vec::new();
    let mut accum = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            if mag < threshold {
                continue;
            }
            let dx = gxv / mag;
            let dy = gyv / mag;
            edges.push(EdgePixel {
                x: x as f32,
                y: y as f32,
                mag,
            });

            // A glyph can be darker or lighter than paper, so vote along both
            // gradient directions.
            for &sign in &[-1.0f32, 1.0] {
                let mut r = params.min_radius;
                while r <= params.max_radius {
                    let vx = x as f32 + sign * dx * r;
                    let vy = y as f32 + sign * dy * r;
                    if vx >= 0.0 && vx < (w - 1) as f32 && vy >= 0.0 && vy < (h - 1) as f32 {
                        bilinear_add(&mut accum, w, vx, vy, mag);
                    }
                    r += 1.0;
                }
            }
        }
    }

    let accum_img = image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::from_raw(w, h, accum)
        .expect("accumulator dimensions match");
    let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, params.accum_sigma);
    let smoothed = smoothed.as_raw();

    let max_val = smoothed.iter().cloned().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let vote_threshold = params.vote_threshold * max_val;
    let nms_r = params.min_dist.ceil() as i32;

    let mut peaks = Vec::new();
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let idx = y as usize * w as usize + x as usize;
            let val = smoothed[idx];
            if val < vote_threshold {
                continue;
            }
            let mut is_max = true;
            'neighbors: for dy in -nms_r..=nms_r {
                for dx in -nms_r..=nms_r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if (dx * dx + dy * dy) as f32 > params.min_dist * params.min_dist {
                        continue;
                    }
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let nidx = ny as usize * w as usize + nx as usize;
                    if smoothed[nidx] > val || (smoothed[nidx] == val && nidx < idx) {
                        is_max = false;
                        break 'neighbors;
                    }
                }
            }
            if is_max {
                peaks.push((x as f32, y as f32, val));
            }
        }
    }

    let mut candidates = peaks
        .into_iter()
        .map(|(x, y, score)| {
            let radius = estimate_radius(x, y, &edges, params);
            (score, CandidateSymbol { x, y, radius })
        })
        .collect::<Vec<_>>();
    candidates.sort_by_key(|(score, _)| std::cmp::Reverse(FloatOrd(*score)));
    log::debug!("circle detector found {} candidates", candidates.len());
    candidates.into_iter().map(|(_, c)| c).collect()
}

/// Picks the radius bin with the strongest edge support around a peak.
fn estimate_radius(cx: f32, cy: f32, edges: &[EdgePixel], params: &CircleParams) -> f32 {
    let r_min = params.min_radius.round() as usize;
    let r_max = params.max_radius.round() as usize;
    let mut bins = vec![0.0f32; r_max + 2];
    for edge in edges {
        let dist = ((edge.x - cx).powi(2) + (edge.y - cy).powi(2)).sqrt();
        let bin = dist.round() as usize;
        if (r_min..=r_max).contains(&bin) {
            bins[bin] += edge.mag;
        }
    }
    bins.iter()
        .enumerate()
        .skip(r_min)
        .max_by_key(|(_, support)| FloatOrd(**support))
        .filter(|(_, support)| **support > 0.0)
        .map(|(r, _)| r as f32)
        .unwrap_or(params.min_radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White background with a dark ring of the given radius and stroke.
    fn make_ring_image(w: u32, h: u32, cx: f32, cy: f32, radius: f32, stroke: f32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, image::Luma([255u8]));
        for y in 0..h {
            for x in 0..w {
                let dist = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                if (dist - radius).abs() <= stroke / 2.0 {
                    img.put_pixel(x, y, image::Luma([20u8]));
                }
            }
        }
        img
    }

    #[test]
    fn recovers_a_synthetic_ring_center_and_radius() {
        let img = make_ring_image(200, 200, 100.0, 80.0, 20.0, 3.0);
        let found = find_circles(&img, &CircleParams::default());
        assert!(!found.is_empty(), "expected at least one candidate");
        let best = found[0];
        assert!(
            (best.x - 100.0).abs() <= 2.0 && (best.y - 80.0).abs() <= 2.0,
            "center off: ({}, {})",
            best.x,
            best.y
        );
        assert!(
            (best.radius - 20.0).abs() <= 3.0,
            "radius off: {}",
            best.radius
        );
    }

    #[test]
    fn separates_two_distant_rings() {
        let mut img = make_ring_image(300, 160, 70.0, 80.0, 18.0, 3.0);
        for y in 0..160 {
            for x in 0..300 {
                let dist = ((x as f32 - 230.0).powi(2) + (y as f32 - 80.0).powi(2)).sqrt();
                if (dist - 18.0).abs() <= 1.5 {
                    img.put_pixel(x, y, image::Luma([20u8]));
                }
            }
        }
        let found = find_circles(&img, &CircleParams::default());
        assert!(found.len() >= 2, "expected two candidates, got {}", found.len());
        let near = |cx: f32| found.iter().any(|c| (c.x - cx).abs() <= 3.0);
        assert!(near(70.0) && near(230.0));
    }

    #[test]
    fn blank_image_yields_no_candidates() {
        let img = GrayImage::from_pixel(120, 120, image::Luma([255u8]));
        assert!(find_circles(&img, &CircleParams::default()).is_empty());
    }

    #[test]
    fn tiny_image_yields_no_candidates() {
        let img = GrayImage::from_pixel(2, 2, image::Luma([0u8]));
        assert!(find_circles(&img, &CircleParams::default()).is_empty());
    }

    #[test]
    fn dpi_profile_scales_linearly_with_floors() {
        let hi = CircleParams::for_dpi(300);
        assert_eq!(hi.min_dist, 30.0);
        assert_eq!(hi.min_radius, 5.0);
        assert_eq!(hi.max_radius, 40.0);

        let half = CircleParams::for_dpi(150);
        assert_eq!(half.min_dist, 15.0);
        assert_eq!(half.max_radius, 20.0);

        let coarse = CircleParams::for_dpi(40);
        assert_eq!(coarse.min_dist, 8.0);
        assert_eq!(coarse.min_radius, 2.0);
        assert_eq!(coarse.max_radius, 8.0);
    }
}
