// src/render/mod.rs

//! Lays an [`Invoice`] out as a landscape US Letter PDF: centered title, a
//! gridded line-item table whose header repeats on every page, and a
//! right-aligned summary block.

pub mod metrics;
mod page;

use crate::error::BillingError;
use crate::invoice::Invoice;
use lopdf::content::Content;
use lopdf::{Document, Object, Stream, dictionary};
use metrics::{Font, clip_text, wrap_text};
use page::{Align, PageCanvas};
use tracing::{debug, info, info_span, warn};

const PAGE_WIDTH: f32 = 792.0;
const PAGE_HEIGHT: f32 = 612.0;
const MARGIN: f32 = 54.0;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Relative column widths: Date, MLS, Property, price.
const COLUMN_WEIGHTS: [f32; 4] = [1.0, 1.2, 6.0, 1.3];
const PROPERTY_COLUMN: usize = 2;
const PRICE_COLUMN: usize = 3;
const CELL_PADDING_X: f32 = 6.0;
const LEADING: f32 = 1.2;

const TITLE_SIZE: f32 = 16.0;
/// Gap between the title and the table.
const TITLE_GAP: f32 = 20.0 + 21.6;

const HEADER_SIZE: f32 = 10.0;
const HEADER_PADDING_Y: f32 = 12.0;
const HEADER_HEIGHT: f32 = HEADER_SIZE * LEADING + 2.0 * HEADER_PADDING_Y;
const BODY_SIZE: f32 = 9.0;
const BODY_PADDING_Y: f32 = 8.0;
const BODY_LINE: f32 = BODY_SIZE * LEADING;
const GRID_WIDTH: f32 = 0.5;
const HEADER_RULE_WIDTH: f32 = 2.0;

/// Gap between the table and the summary block.
const SUMMARY_GAP: f32 = 36.0;
const SUMMARY_SIZE: f32 = 10.0;
const SUMMARY_PADDING_Y: f32 = 5.0;
const SUMMARY_RULE_WIDTH: f32 = 1.5;
/// Summary label / value column split.
const SUMMARY_WEIGHTS: [f32; 2] = [8.2, 1.3];

const FOOTER_SIZE: f32 = 8.0;

fn column_widths<const N: usize>(weights: [f32; N]) -> [f32; N] {
    let total: f32 = weights.iter().sum();
    weights.map(|w| USABLE_WIDTH * w / total)
}

/// Render the invoice to PDF bytes. The document is built completely in
/// memory; nothing is returned unless serialization succeeded.
pub fn render_invoice(invoice: &Invoice) -> Result<Vec<u8>, BillingError> {
    let span = info_span!("render", lines = invoice.lines.len());
    let _guard = span.enter();

    if invoice.lines.is_empty() {
        return Err(BillingError::Rendering(
            "invoice has no line items".to_string(),
        ));
    }

    let pages = InvoiceLayout::new(invoice).run();
    let page_count = pages.len();
    let bytes = assemble(pages, &invoice.title)?;

    info!(pages = page_count, bytes = bytes.len(), "Rendered invoice PDF");
    Ok(bytes)
}

/// A body row after wrapping: one list of lines per column.
struct PreparedRow {
    cells: [Vec<String>; 4],
}

impl PreparedRow {
    fn line_count(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(1)
    }

    fn height(&self) -> f32 {
        self.line_count() as f32 * BODY_LINE + 2.0 * BODY_PADDING_Y
    }

    /// Keep the first `at` lines of every cell; return the rest as a
    /// continuation row.
    fn split_off(&mut self, at: usize) -> PreparedRow {
        let mut rest: [Vec<String>; 4] = Default::default();
        for (cell, tail) in self.cells.iter_mut().zip(rest.iter_mut()) {
            if cell.len() > at {
                *tail = cell.split_off(at);
            }
        }
        PreparedRow { cells: rest }
    }
}

/// Body lines that fit in `room` points of vertical space.
fn lines_fitting(room: f32) -> usize {
    ((room - 2.0 * BODY_PADDING_Y) / BODY_LINE).floor().max(0.0) as usize
}

struct InvoiceLayout<'a> {
    invoice: &'a Invoice,
    columns: [f32; 4],
    pages: Vec<PageCanvas>,
    canvas: PageCanvas,
    y: f32,
}

impl<'a> InvoiceLayout<'a> {
    fn new(invoice: &'a Invoice) -> Self {
        Self {
            invoice,
            columns: column_widths(COLUMN_WEIGHTS),
            pages: Vec::new(),
            canvas: PageCanvas::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn run(mut self) -> Vec<PageCanvas> {
        self.draw_title();
        self.draw_header();

        let rows: Vec<PreparedRow> = self
            .invoice
            .lines
            .iter()
            .map(|line| self.prepare_row(line.cells()))
            .collect();
        for mut row in rows {
            loop {
                if self.y - row.height() >= MARGIN {
                    self.draw_row(&row);
                    break;
                }
                if row.height() <= PAGE_HEIGHT - 2.0 * MARGIN - HEADER_HEIGHT {
                    self.new_table_page();
                    continue;
                }

                // Taller than a whole page: fill what is left here and carry
                // the remaining lines over.
                let mut fits = lines_fitting(self.y - MARGIN);
                if fits == 0 {
                    self.new_table_page();
                    fits = lines_fitting(self.y - MARGIN).max(1);
                }
                warn!(
                    lines = row.line_count(),
                    page = self.pages.len() + 1,
                    "Row taller than a page, continuing it on the next page"
                );
                let rest = row.split_off(fits);
                self.draw_row(&row);
                self.new_table_page();
                row = rest;
            }
        }

        self.draw_summary();
        self.pages.push(self.canvas);
        add_footers(&mut self.pages);
        self.pages
    }

    fn break_page(&mut self) {
        let finished = std::mem::take(&mut self.canvas);
        self.pages.push(finished);
        self.y = PAGE_HEIGHT - MARGIN;
        debug!(page = self.pages.len() + 1, "Starting new page");
    }

    fn new_table_page(&mut self) {
        self.break_page();
        self.draw_header();
    }

    fn column_x(&self, index: usize) -> f32 {
        MARGIN + self.columns[..index].iter().sum::<f32>()
    }

    fn draw_title(&mut self) {
        let baseline = self.y - TITLE_SIZE;
        self.canvas.text(
            &self.invoice.title,
            Font::Bold,
            TITLE_SIZE,
            MARGIN,
            baseline,
            USABLE_WIDTH,
            Align::Center,
        );
        self.y -= TITLE_SIZE * LEADING + TITLE_GAP;
    }

    fn draw_header(&mut self) {
        let top = self.y;
        let height = HEADER_HEIGHT;
        let baseline = top - HEADER_PADDING_Y - HEADER_SIZE;

        for (i, header) in self.invoice.headers.iter().enumerate() {
            let inner = self.columns[i] - 2.0 * CELL_PADDING_X;
            let text = clip_text(header, Font::Bold, HEADER_SIZE, inner);
            let align = if i == PRICE_COLUMN { Align::Right } else { Align::Left };
            let x = self.column_x(i) + CELL_PADDING_X;
            self.canvas
                .text(&text, Font::Bold, HEADER_SIZE, x, baseline, inner, align);
        }

        self.canvas.hline(MARGIN, top, USABLE_WIDTH, GRID_WIDTH);
        self.draw_column_rules(top, top - height);
        self.canvas
            .hline(MARGIN, top - height, USABLE_WIDTH, HEADER_RULE_WIDTH);
        self.y = top - height;
    }

    fn prepare_row(&self, cells: [&str; 4]) -> PreparedRow {
        let mut prepared: [Vec<String>; 4] = Default::default();
        for (i, cell) in cells.iter().enumerate() {
            let inner = self.columns[i] - 2.0 * CELL_PADDING_X;
            prepared[i] = if i == PROPERTY_COLUMN {
                wrap_text(cell, Font::Regular, BODY_SIZE, inner)
            } else {
                vec![clip_text(cell, Font::Regular, BODY_SIZE, inner)]
            };
        }
        PreparedRow { cells: prepared }
    }

    fn draw_row(&mut self, row: &PreparedRow) {
        let top = self.y;
        let height = row.height();
        let first_baseline = top - BODY_PADDING_Y - BODY_SIZE;

        for (i, lines) in row.cells.iter().enumerate() {
            let inner = self.columns[i] - 2.0 * CELL_PADDING_X;
            let align = if i == PRICE_COLUMN { Align::Right } else { Align::Left };
            let x = self.column_x(i) + CELL_PADDING_X;
            for (n, line) in lines.iter().enumerate() {
                let baseline = first_baseline - n as f32 * BODY_LINE;
                self.canvas
                    .text(line, Font::Regular, BODY_SIZE, x, baseline, inner, align);
            }
        }

        self.draw_column_rules(top, top - height);
        self.canvas
            .hline(MARGIN, top - height, USABLE_WIDTH, GRID_WIDTH);
        self.y = top - height;
    }

    fn draw_column_rules(&mut self, top: f32, bottom: f32) {
        for i in 0..=self.columns.len() {
            let x = self.column_x(i);
            self.canvas.vline(x, top, bottom, GRID_WIDTH);
        }
    }

    fn draw_summary(&mut self) {
        let row_height = SUMMARY_SIZE * LEADING + 2.0 * SUMMARY_PADDING_Y;
        let block_height = SUMMARY_GAP + 2.0 * row_height;
        if self.y - block_height < MARGIN {
            self.break_page();
        } else {
            self.y -= SUMMARY_GAP;
        }

        let [label_width, value_width] = column_widths(SUMMARY_WEIGHTS);
        let summary = &self.invoice.summary;
        let rows = [
            ("Total", summary.total_display()),
            ("Billing Date", summary.billing_date.clone()),
        ];

        self.canvas
            .hline(MARGIN, self.y, USABLE_WIDTH, SUMMARY_RULE_WIDTH);
        for (label, value) in rows {
            let baseline = self.y - SUMMARY_PADDING_Y - SUMMARY_SIZE;
            self.canvas.text(
                label,
                Font::Bold,
                SUMMARY_SIZE,
                MARGIN + CELL_PADDING_X,
                baseline,
                label_width - 2.0 * CELL_PADDING_X,
                Align::Right,
            );
            self.canvas.text(
                &value,
                Font::Bold,
                SUMMARY_SIZE,
                MARGIN + label_width + CELL_PADDING_X,
                baseline,
                value_width - 2.0 * CELL_PADDING_X,
                Align::Right,
            );
            self.y -= row_height;
        }
    }
}

fn add_footers(pages: &mut [PageCanvas]) {
    let total = pages.len();
    for (i, canvas) in pages.iter_mut().enumerate() {
        canvas.text(
            &format!("Page {} of {}", i + 1, total),
            Font::Regular,
            FOOTER_SIZE,
            MARGIN,
            MARGIN / 2.0,
            USABLE_WIDTH,
            Align::Center,
        );
    }
}

fn assemble(pages: Vec<PageCanvas>, title: &str) -> Result<Vec<u8>, BillingError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in [Font::Regular, Font::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for canvas in pages {
        let content = Content {
            operations: canvas.into_operations(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![
        0.0_f32.into(),
        0.0_f32.into(),
        PAGE_WIDTH.into(),
        PAGE_HEIGHT.into(),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(page::encode_win_ansi(title)),
        "Producer" => Object::string_literal("listing-billing"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| BillingError::Rendering(e.to_string()))?;
    Ok(bytes)
}
