use crate::config::RenderConfig;
use crate::ir::{LabelSlot, Viewport};
use crate::layout::{LabelLayout, LabelPlacement, MarkerFootprint};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const MARKER_RADIUS: f64 = 4.0;

/// Preview of one frame: markers, their obstacle zones and the placed labels.
pub fn render_svg(
    layout: &LabelLayout,
    markers: &[MarkerFootprint],
    viewport: Viewport,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let width = viewport.width.max(1.0);
    let height = viewport.height.max(1.0);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    if config.show_obstacles {
        for marker in markers {
            for rect in &marker.obstacles {
                svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
                    rect.x, rect.y, rect.width, rect.height, theme.obstacle_color
                ));
            }
        }
    }

    for marker in markers {
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{MARKER_RADIUS}\" fill=\"{}\"/>",
            marker.x, marker.y, theme.marker_color
        ));
    }

    if config.show_collision_boxes {
        for placement in &layout.placements {
            let rect = placement.collision;
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"0.8\" stroke-dasharray=\"3 2\"/>",
                rect.x, rect.y, rect.width, rect.height, theme.collision_box_color
            ));
        }
    }

    for placement in &layout.placements {
        svg.push_str(&label_svg(placement, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn label_svg(placement: &LabelPlacement, theme: &Theme) -> String {
    let (anchor, x) = match placement.slot {
        LabelSlot::BelowLeft => ("end", placement.left + placement.width),
        LabelSlot::BelowRight => ("start", placement.left),
        LabelSlot::Below | LabelSlot::Above => ("middle", placement.left + placement.width / 2.0),
    };
    let baseline = placement.top + placement.height / 2.0;
    let fill = if placement.forced {
        &theme.forced_label_color
    } else {
        &theme.label_text_color
    };
    format!(
        "<text x=\"{x:.2}\" y=\"{baseline:.2}\" text-anchor=\"{anchor}\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"3\" paint-order=\"stroke\" data-id=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.label_halo_color,
        escape_xml(&placement.id),
        escape_xml(&placement.title)
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
