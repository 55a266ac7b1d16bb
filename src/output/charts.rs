use std::f64::consts::PI;

use plotters::prelude::*;

use crate::error::{RiskError, RiskResult};
use crate::scoring::{CohortSummary, RiskCategory, RocCurve};

const NAVY: RGBColor = RGBColor(0, 0, 128);
const CURVE: RGBColor = RGBColor(31, 119, 180);
const GRID: RGBColor = RGBColor(225, 225, 225);

/// Packed 8-bit RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgb: vec![0; width as usize * height as usize * 3],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        (self.rgb[i], self.rgb[i + 1], self.rgb[i + 2])
    }
}

fn chart_error<E: std::fmt::Display>(e: E) -> RiskError {
    RiskError::Chart(e.to_string())
}

fn category_color(category: RiskCategory) -> RGBColor {
    let (r, g, b) = category.color();
    RGBColor(r, g, b)
}

/// Pie chart of the category distribution, High first, clockwise from 12 o'clock.
pub fn category_pie(summary: &CohortSummary, width: u32, height: u32) -> RiskResult<RasterImage> {
    if summary.total_count == 0 {
        return Err(RiskError::EmptyBatch);
    }

    let mut image = RasterImage::blank(width, height);
    {
        let root = BitMapBackend::with_buffer(&mut image.rgb, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let center = (width as f64 / 2.0, height as f64 / 2.0);
        let radius = 0.42 * width.min(height) as f64;
        let total = summary.total_count as f64;

        let mut start = -PI / 2.0;
        let mut edges = Vec::new();
        for category in RiskCategory::ALL {
            let count = summary.count(category);
            if count == 0 {
                continue;
            }
            let sweep = 2.0 * PI * count as f64 / total;
            root.draw(&Polygon::new(
                sector(center, radius, start, sweep),
                category_color(category).filled(),
            ))
            .map_err(chart_error)?;
            edges.push(start);
            start += sweep;
        }

        // Separators only make sense between two or more slices.
        if edges.len() > 1 {
            for angle in edges {
                let edge = (
                    (center.0 + radius * angle.cos()).round() as i32,
                    (center.1 + radius * angle.sin()).round() as i32,
                );
                let hub = (center.0.round() as i32, center.1.round() as i32);
                root.draw(&PathElement::new(vec![hub, edge], WHITE.stroke_width(2)))
                    .map_err(chart_error)?;
            }
        }

        root.present().map_err(chart_error)?;
    }

    Ok(image)
}

fn sector(center: (f64, f64), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push((center.0.round() as i32, center.1.round() as i32));
    for step in 0..=steps {
        let angle = start + sweep * step as f64 / steps as f64;
        points.push((
            (center.0 + radius * angle.cos()).round() as i32,
            (center.1 + radius * angle.sin()).round() as i32,
        ));
    }
    points
}

/// ROC curve over the unit square with the chance diagonal.
pub fn roc_chart(curve: &RocCurve, width: u32, height: u32) -> RiskResult<RasterImage> {
    let mut image = RasterImage::blank(width, height);
    {
        let root = BitMapBackend::with_buffer(&mut image.rgb, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(16)
            .build_cartesian_2d(0f64..1f64, 0f64..1f64)
            .map_err(chart_error)?;

        for i in 1..5 {
            let v = i as f64 / 5.0;
            chart
                .draw_series(LineSeries::new(vec![(v, 0.0), (v, 1.0)], GRID.stroke_width(1)))
                .map_err(chart_error)?;
            chart
                .draw_series(LineSeries::new(vec![(0.0, v), (1.0, v)], GRID.stroke_width(1)))
                .map_err(chart_error)?;
        }

        chart
            .draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], NAVY.stroke_width(1)))
            .map_err(chart_error)?;

        chart
            .draw_series(LineSeries::new(
                curve
                    .false_positive_rates()
                    .into_iter()
                    .zip(curve.true_positive_rates()),
                CURVE.stroke_width(3),
            ))
            .map_err(chart_error)?;

        chart
            .plotting_area()
            .draw(&Rectangle::new([(0.0, 0.0), (1.0, 1.0)], BLACK.stroke_width(1)))
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    Ok(image)
}
