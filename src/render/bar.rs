use super::palette::blues;
use super::{ImageArtifact, BAR_CHART_ALT};
use crate::config::ChartConfig;
use crate::error::RenderError;
use crate::summary::AttendanceMeans;
use crate::types::AgeBand;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

const CHART: &str = "bar chart";

/// One bar of the attendance chart. `fraction` is the mean rate divided by
/// 100; bands without data have no bar and no label.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub band: AgeBand,
    pub fraction: Option<f64>,
    pub label: Option<String>,
    pub color: RGBColor,
}

pub fn bar_layout(means: &AttendanceMeans) -> Vec<Bar> {
    let fractions: Vec<Option<f64>> = means.iter()
        .map(|(_, v)| Some(v / 100.0).filter(|f| f.is_finite()))
        .collect();

    let (lo, hi) = fractions.iter().flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| (lo.min(*f), hi.max(*f)));

    AgeBand::ALL.iter().zip(fractions)
        .map(|(&band, fraction)| {
            let intensity = match fraction {
                Some(f) if hi > lo => (f - lo) / (hi - lo),
                _ => 0.5,
            };
            Bar {
                band,
                fraction,
                label: fraction.map(|f| format!("{:.1}%", f * 100.0)),
                color: blues(intensity),
            }
        })
        .collect()
}

pub fn render_bar_chart(means: &AttendanceMeans, config: &ChartConfig) -> Result<ImageArtifact, RenderError> {
    let bars = bar_layout(means);
    let top = bars.iter().filter_map(|b| b.fraction).fold(0.0_f64, f64::max);
    // Headroom for the labels above the tallest bar.
    let y_max = if top > 0.0 { top * 1.15 } else { 1.0 };
    let label_offset = y_max * 0.01;
    let last = AgeBand::ALL.len() - 1;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (config.width, config.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| RenderError::draw(CHART, e))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((0usize..last).into_segmented(), 0f64..y_max)
            .map_err(|e| RenderError::draw(CHART, e))?;

        chart.configure_mesh()
            .disable_x_mesh()
            .x_labels(AgeBand::ALL.len())
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => AgeBand::ALL.get(*i).map(|b| b.label().to_string()).unwrap_or_default(),
                _ => String::new(),
            })
            .y_label_formatter(&|v| format!("{:.0}%", v * 100.0))
            .x_desc("Age Group")
            .y_desc("Attendance Rate (%)")
            .label_style(("sans-serif", 14))
            .axis_desc_style(("sans-serif", 14))
            .draw()
            .map_err(|e| RenderError::draw(CHART, e))?;

        chart.draw_series(bars.iter().enumerate().filter_map(|(i, bar)| {
            let fraction = bar.fraction?;
            let mut rect = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), fraction)],
                bar.color.filled(),
            );
            rect.set_margin(0, 0, 12, 12);
            Some(rect)
        }))
        .map_err(|e| RenderError::draw(CHART, e))?;

        let label_style = ("sans-serif", 14).into_font().color(&BLACK).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(bars.iter().enumerate().filter_map(|(i, bar)| {
            let fraction = bar.fraction?;
            let label = bar.label.clone()?;
            Some(Text::new(label, (SegmentValue::CenterOf(i), fraction + label_offset), label_style.clone()))
        }))
        .map_err(|e| RenderError::draw(CHART, e))?;

        root.present().map_err(|e| RenderError::draw(CHART, e))?;
    }

    Ok(ImageArtifact { file_name: "bar_chart.svg", alt: BAR_CHART_ALT, svg })
}
