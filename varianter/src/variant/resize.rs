//! Target dimension calculation.

use super::options::FitStrategy;

/// Computes output dimensions for `source` fitted to `target_width`.
///
/// Aspect ratio is preserved and neither side drops below 1. When the
/// limiting side already equals the target, or is smaller and upscaling is
/// off, the source dimensions are returned unchanged.
pub fn target_dimensions(
    source: (u32, u32),
    target_width: u32,
    fit: FitStrategy,
    allow_upscale: bool,
) -> (u32, u32) {
    let (width, height) = source;
    if width == 0 || height == 0 || target_width == 0 {
        return source;
    }

    let limit = match fit {
        FitStrategy::Inside => width,
        FitStrategy::InsideSquare => width.max(height),
    };

    if limit == target_width || (limit < target_width && !allow_upscale) {
        return source;
    }

    (
        scale_side(width, target_width, limit),
        scale_side(height, target_width, limit),
    )
}

/// `round(side * target / limit)`, at least 1.
fn scale_side(side: u32, target: u32, limit: u32) -> u32 {
    let side = u64::from(side);
    let target = u64::from(target);
    let limit = u64::from(limit);
    let scaled = (side * target + limit / 2) / limit;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}
