use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use super::charts::RasterImage;
use crate::config::ReportConfig;
use crate::error::{RiskError, RiskResult};
use crate::scoring::CohortSummary;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
// Upper estimate of the mean Helvetica glyph width, in em.
const AVG_GLYPH_EM: f32 = 0.6;

pub const TITLE_FONT_SIZE: f32 = 18.0;
pub const FOOTER_FONT_SIZE: f32 = 9.0;

/// A rectangle on the page, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Slot {
    /// Size of an image of `px_width` x `px_height` scaled to fit inside the slot.
    pub fn fit(&self, px_width: u32, px_height: u32) -> (f32, f32) {
        let aspect = px_height as f32 / px_width as f32;
        let width = self.width.min(self.height / aspect);
        (width, width * aspect)
    }

    fn top(&self) -> f32 {
        self.y + self.height
    }
}

pub const TITLE_Y: f32 = 279.0;
pub const SUMMARY_TOP_Y: f32 = 266.0;
pub const LINE_SPACING: f32 = 7.0;
pub const PIE_SLOT: Slot = Slot { x: MARGIN_MM, y: 150.0, width: 100.0, height: 80.0 };
pub const LEGEND_X: f32 = 130.0;
pub const ROC_CAPTION_Y: f32 = 141.0;
pub const ROC_SLOT: Slot = Slot { x: MARGIN_MM, y: 30.0, width: 130.0, height: 100.0 };
pub const FOOTER_Y: f32 = 14.0;

fn pdf_error<E: std::fmt::Display>(e: E) -> RiskError {
    RiskError::Pdf(e.to_string())
}

fn text_width_mm(chars: usize, font_size: f32) -> f32 {
    chars as f32 * font_size * AVG_GLYPH_EM * PT_TO_MM
}

/// Longest single line that stays inside the side margins at `font_size`.
pub fn max_line_chars(font_size: f32) -> usize {
    ((PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / (font_size * AVG_GLYPH_EM * PT_TO_MM)) as usize
}

fn centered_x(text: &str, font_size: f32) -> f32 {
    let width = text_width_mm(text.chars().count(), font_size);
    ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_MM)
}

fn place_image(layer: &PdfLayerReference, raster: &RasterImage, slot: Slot) -> RiskResult<()> {
    let buffer = RgbImage::from_raw(raster.width, raster.height, raster.rgb.clone())
        .ok_or_else(|| RiskError::Pdf("raster buffer does not match its dimensions".to_string()))?;
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(buffer));

    let (width_mm, height_mm) = slot.fit(raster.width, raster.height);
    let dpi = raster.width as f32 * 25.4 / width_mm;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(slot.x)),
            translate_y: Some(Mm(slot.top() - height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    Ok(())
}

/// Render the report page: title, summary lines, category pie, ROC chart and footer.
pub fn to_pdf(
    summary: &CohortSummary,
    category_chart: &RasterImage,
    roc_chart: &RasterImage,
    auc: f64,
    config: &ReportConfig,
) -> RiskResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        config.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Report",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
    let oblique = doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?;

    layer.use_text(
        config.title.as_str(),
        TITLE_FONT_SIZE,
        Mm(centered_x(&config.title, TITLE_FONT_SIZE)),
        Mm(TITLE_Y),
        &bold,
    );

    let mut y = SUMMARY_TOP_Y;
    for line in summary.summary_lines() {
        layer.use_text(line, 12.0, Mm(MARGIN_MM), Mm(y), &regular);
        y -= LINE_SPACING;
    }

    write_legend(&layer, summary, &regular, &bold);
    place_image(&layer, category_chart, PIE_SLOT)?;

    layer.use_text(
        format!("ROC curve on the reference dataset (AUC = {:.2})", auc),
        12.0,
        Mm(MARGIN_MM),
        Mm(ROC_CAPTION_Y),
        &bold,
    );
    layer.use_text(
        "x: false positive rate, y: true positive rate, diagonal: chance level",
        9.0,
        Mm(MARGIN_MM),
        Mm(ROC_CAPTION_Y - 5.0),
        &regular,
    );
    place_image(&layer, roc_chart, ROC_SLOT)?;

    layer.use_text(config.footer.as_str(), FOOTER_FONT_SIZE, Mm(MARGIN_MM), Mm(FOOTER_Y), &oblique);

    doc.save_to_bytes().map_err(pdf_error)
}

fn write_legend(
    layer: &PdfLayerReference,
    summary: &CohortSummary,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let mut y = PIE_SLOT.top() - 10.0;
    layer.use_text("Risk group distribution", 12.0, Mm(LEGEND_X), Mm(y), bold);
    for line in summary.distribution_lines() {
        y -= LINE_SPACING;
        layer.use_text(line, 11.0, Mm(LEGEND_X), Mm(y), regular);
    }
}
