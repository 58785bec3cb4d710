use eframe::egui::{Color32, Painter, Pos2, Rect, Vec2, pos2};
use glam::{Vec3, vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use knowledge_universe::dataset::palette::Rgb;
use knowledge_universe::engine::CameraController;

pub(super) const SPACE_BACKGROUND: Color32 = Color32::from_rgb(4, 6, 14);

const STAR_COUNT: usize = 1_800;
const STAR_SPREAD: f32 = 2_000.0;

pub(super) fn rgb_color(color: Rgb, opacity: f32) -> Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn ndc_to_screen(rect: Rect, ndc: Vec3) -> Pos2 {
    pos2(
        rect.center().x + ndc.x * rect.width() * 0.5,
        rect.center().y - ndc.y * rect.height() * 0.5,
    )
}

pub(super) fn screen_to_ndc(rect: Rect, screen: Pos2) -> glam::Vec2 {
    let offset = screen - rect.center();
    glam::Vec2::new(
        offset.x / (rect.width() * 0.5).max(1.0),
        -offset.y / (rect.height() * 0.5).max(1.0),
    )
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) struct Star {
    position: Vec3,
    brightness: u8,
}

pub(super) fn starfield(seed: u64) -> Vec<Star> {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5354_4152);
    (0..STAR_COUNT)
        .map(|_| Star {
            position: vec3(
                (rng.r#gen::<f32>() - 0.5) * STAR_SPREAD,
                (rng.r#gen::<f32>() - 0.5) * STAR_SPREAD,
                (rng.r#gen::<f32>() - 0.5) * STAR_SPREAD,
            ),
            brightness: rng.gen_range(90..=230),
        })
        .collect()
}

pub(super) fn draw_stars(painter: &Painter, rect: Rect, camera: &CameraController, stars: &[Star]) {
    painter.rect_filled(rect, 0.0, SPACE_BACKGROUND);

    for star in stars {
        let Some(ndc) = camera.project(star.position) else {
            continue;
        };
        if ndc.z > 1.0 {
            continue;
        }

        let position = ndc_to_screen(rect, ndc);
        if !rect.contains(position) {
            continue;
        }

        let size = (1.4 - ndc.z).clamp(0.5, 1.2);
        painter.circle_filled(position, size, Color32::from_gray(star.brightness));
    }
}

pub(super) fn label_offset(radius: f32) -> Vec2 {
    Vec2::new(radius + 5.0, 0.0)
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    #[test]
    fn screen_and_ndc_conversions_agree() {
        let rect = Rect::from_min_size(pos2(100.0, 50.0), vec2(800.0, 600.0));
        let screen = pos2(300.0, 125.0);
        let ndc = screen_to_ndc(rect, screen);
        let back = ndc_to_screen(rect, ndc.extend(0.5));
        assert!((back - screen).length() < 1e-3);
        assert_eq!(screen_to_ndc(rect, rect.center()), glam::Vec2::ZERO);
        assert!(ndc.y > 0.0);
    }

    #[test]
    fn blend_endpoints_match_inputs() {
        let base = Color32::from_rgb(10, 20, 30);
        let overlay = Color32::from_rgb(200, 100, 0);
        assert_eq!(blend_color(base, overlay, 0.0), base);
        assert_eq!(blend_color(base, overlay, 1.0), overlay);
    }

    #[test]
    fn starfield_is_seeded() {
        let first = starfield(3);
        let second = starfield(3);
        assert_eq!(first.len(), STAR_COUNT);
        assert_eq!(first[10].position, second[10].position);
    }
}
