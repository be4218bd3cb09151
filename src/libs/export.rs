//! Empenho export and management of the exported files.
//!
//! Exports land in one directory, named `empenhos_YYYYMMDD_HHMMSS.<ext>`.
//! CSV, JSON and Excel carry every column. PDF is the printable delivery
//! protocol: a landscape A4 table with a fixed set of columns.
//!
//! ```rust,no_run
//! use empenhos::libs::export::{ExportFormat, Exporter};
//! use std::path::PathBuf;
//!
//! let exporter = Exporter::new(ExportFormat::Excel, PathBuf::from("exports"));
//! let path = exporter.export(&[])?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::libs::empenho::Empenho;
use crate::libs::error::{StoreError, StoreResult};
use crate::libs::formatter::{format_currency, format_date, format_timestamp};
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_xlsxwriter::{Color, Format, Workbook};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

pub const FILE_PREFIX: &str = "empenhos_";

const HEADERS: [&str; 10] = [
    "Entry date",
    "Number",
    "Company",
    "Sector",
    "Note number",
    "Note date",
    "Value",
    "Exit date",
    "Notes",
    "Created at",
];

// PDF page geometry, in millimetres.
const PDF_WIDTH: f32 = 297.0;
const PDF_HEIGHT: f32 = 210.0;
const PDF_MARGIN: f32 = 15.0;
const PDF_ROW_HEIGHT: f32 = 7.0;
const PDF_FIRST_PAGE_ROWS: usize = 18;
const PDF_PAGE_ROWS: usize = 23;
const PDF_COMPANY_CHARS: usize = 42;

const PDF_TITLE: &str = "PROTOCOLO PARA ENTREGA DE NOTAS FISCAIS";
const PDF_SUBTITLE: &str = "UNIDADE DE CONTROLE INTERNO";
const PDF_STATEMENT: &str =
    "Atestamos que as respectivas notas fiscais foram entregues para a Secretaria de Finanças na presente data.";

/// Header and left edge of each PDF column.
const PDF_COLUMNS: [(&str, f32); 6] = [
    ("Data Entrada", 15.0),
    ("Nº Empenho", 45.0),
    ("Empresa", 72.0),
    ("Setor", 162.0),
    ("Nº Nota", 202.0),
    ("Valor", 242.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// One exported record, already in display form.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub entry_date: String,
    pub number: i64,
    pub company: String,
    pub sector: String,
    pub note_number: String,
    pub note_date: String,
    pub value: f64,
    pub exit_date: String,
    pub notes: String,
    pub created_at: String,
}

impl From<&Empenho> for ExportRow {
    fn from(e: &Empenho) -> Self {
        ExportRow {
            entry_date: format_date(&e.entry_date),
            number: e.number,
            company: e.company.clone(),
            sector: e.sector.clone(),
            note_number: e.note_number.clone(),
            note_date: format_date(&e.note_date),
            value: e.value,
            exit_date: format_date(&e.exit_date),
            notes: e.notes.clone().unwrap_or_default(),
            created_at: format_timestamp(&e.created_at),
        }
    }
}

pub struct Exporter {
    format: ExportFormat,
    dir: PathBuf,
}

impl Exporter {
    pub fn new(format: ExportFormat, dir: PathBuf) -> Self {
        Self { format, dir }
    }

    pub fn file_name(&self, at: NaiveDateTime) -> String {
        format!("{}{}.{}", FILE_PREFIX, at.format("%Y%m%d_%H%M%S"), self.format.extension())
    }

    /// Writes `empenhos` and returns the created file.
    pub fn export(&self, empenhos: &[Empenho]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(self.file_name(Local::now().naive_local()));
        let rows: Vec<ExportRow> = empenhos.iter().map(ExportRow::from).collect();

        match self.format {
            ExportFormat::Csv => write_csv(&path, &rows)?,
            ExportFormat::Json => write_json(&path, &rows)?,
            ExportFormat::Excel => write_excel(&path, &rows)?,
            ExportFormat::Pdf => write_pdf(&path, &rows)?,
        }

        tracing::info!(path = %path.display(), rows = rows.len(), "export written");
        Ok(path)
    }
}

fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(HEADERS)?;

    for row in rows {
        wtr.write_record(&[
            row.entry_date.clone(),
            row.number.to_string(),
            row.company.clone(),
            row.sector.clone(),
            row.note_number.clone(),
            row.note_date.clone(),
            format_currency(row.value),
            row.exit_date.clone(),
            row.notes.clone(),
            row.created_at.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_json(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    File::create(path)?.write_all(json.as_bytes())?;
    Ok(())
}

fn write_excel(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Empenhos")?;

    let header_format = Format::new().set_bold().set_background_color(Color::Gray);
    let money_format = Format::new().set_num_format("\"R$\" #,##0.00");

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, &row.entry_date)?;
        worksheet.write_number(r, 1, row.number as f64)?;
        worksheet.write_string(r, 2, &row.company)?;
        worksheet.write_string(r, 3, &row.sector)?;
        worksheet.write_string(r, 4, &row.note_number)?;
        worksheet.write_string(r, 5, &row.note_date)?;
        worksheet.write_number_with_format(r, 6, row.value, &money_format)?;
        worksheet.write_string(r, 7, &row.exit_date)?;
        worksheet.write_string(r, 8, &row.notes)?;
        worksheet.write_string(r, 9, &row.created_at)?;
    }

    worksheet.autofit();
    workbook.save(path)?;
    Ok(())
}

/// Row ranges per PDF page. The first page also carries the heading, so it
/// holds fewer rows. An empty export still gets one page.
fn pdf_pages(rows: usize) -> Vec<Range<usize>> {
    let mut pages = vec![0..rows.min(PDF_FIRST_PAGE_ROWS)];
    let mut start = PDF_FIRST_PAGE_ROWS;
    while start < rows {
        let end = (start + PDF_PAGE_ROWS).min(rows);
        pages.push(start..end);
        start = end;
    }
    pages
}

fn pdf_cells(row: &ExportRow) -> [String; 6] {
    let company = if row.company.chars().count() > PDF_COMPANY_CHARS {
        let kept: String = row.company.chars().take(PDF_COMPANY_CHARS - 3).collect();
        format!("{}...", kept)
    } else {
        row.company.clone()
    };

    [
        row.entry_date.clone(),
        row.number.to_string(),
        company,
        row.sector.clone(),
        row.note_number.clone(),
        format_currency(row.value),
    ]
}

fn write_pdf(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let (doc, first_page, first_layer) = PdfDocument::new("Empenhos", Mm(PDF_WIDTH), Mm(PDF_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow::anyhow!("PDF font: {}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow::anyhow!("PDF font: {}", e))?;

    let generated = format!("Gerado em: {}", format_timestamp(&Local::now().naive_local()));
    let pages = pdf_pages(rows.len());
    let page_count = pages.len();

    for (index, range) in pages.into_iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PDF_WIDTH), Mm(PDF_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let mut y = PDF_HEIGHT - PDF_MARGIN;
        if index == 0 {
            layer.use_text(PDF_TITLE, 16.0, Mm(PDF_MARGIN), Mm(y), &bold);
            y -= 8.0;
            layer.use_text(PDF_SUBTITLE, 13.0, Mm(PDF_MARGIN), Mm(y), &bold);
            y -= 7.0;
            layer.use_text(PDF_STATEMENT, 10.0, Mm(PDF_MARGIN), Mm(y), &regular);
            y -= 12.0;
        }

        pdf_line(&layer, PDF_COLUMNS.map(|(header, _)| header.to_string()), y, 10.0, &bold);
        for row in &rows[range] {
            y -= PDF_ROW_HEIGHT;
            pdf_line(&layer, pdf_cells(row), y, 9.0, &regular);
        }

        let footer = format!("{}    Página {}/{}", generated, index + 1, page_count);
        layer.use_text(footer, 8.0, Mm(PDF_MARGIN), Mm(PDF_MARGIN - 5.0), &regular);
    }

    let mut writer = BufWriter::new(File::create(path)?);
    doc.save(&mut writer).map_err(|e| anyhow::anyhow!("PDF save: {}", e))?;
    Ok(())
}

fn pdf_line(layer: &PdfLayerReference, cells: [String; 6], y: f32, size: f32, font: &IndirectFontRef) {
    for (text, (_, x)) in cells.into_iter().zip(PDF_COLUMNS) {
        layer.use_text(text, size, Mm(x), Mm(y), font);
    }
}

/// An exported file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub name: String,
    pub size: u64,
    pub modified: Option<NaiveDateTime>,
}

/// Exported files in the export directory.
pub struct ExportFiles {
    dir: PathBuf,
}

impl ExportFiles {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Regular files in the directory, newest first.
    pub fn list(&self) -> StoreResult<Vec<ExportFile>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .ok()
                .map(|t| chrono::DateTime::<Local>::from(t).naive_local());
            files.push(ExportFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified,
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    /// Full path for `name`, which must be a bare file name inside the
    /// export directory.
    pub fn resolve(&self, name: &str) -> StoreResult<PathBuf> {
        let candidate = Path::new(name);
        let mut components = candidate.components();
        let is_bare_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if name.trim().is_empty() || !is_bare_name || name.contains(['/', '\\']) {
            return Err(StoreError::validation("file", format!("'{}' is not a file in the export directory", name)));
        }
        Ok(self.dir.join(candidate))
    }

    /// Returns whether a file was removed.
    pub fn delete(&self, name: &str) -> StoreResult<bool> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "export deleted");
        Ok(true)
    }
}
