//! Native document rendering: PDF through lopdf, DOCX through docx-rs, images through
//! `image`/`imageproc`. Work runs on the blocking pool.

use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use async_trait::async_trait;
use docx_rs::{Docx, Paragraph, Pic, Run};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};

use super::{ensure_distinct, DocumentRenderer};
use crate::config::RenderConfig;
use crate::utils::check_file_accessible;
use crate::Result;

/// A4 in PDF points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const FONT_SIZE: i64 = 12;
const LEADING: i64 = 16;
/// Characters per line before wrapping with Helvetica at 12pt
const WRAP_COLUMNS: usize = 90;

/// Usable DOCX page width (6 inches) in EMU
const DOCX_MAX_WIDTH_EMU: u32 = 5_486_400;
const EMU_PER_PIXEL: u32 = 9_525;

const TEXT_IMAGE_PADDING: u32 = 10;
const TEXT_IMAGE_LINE_GAP: u32 = 5;

pub struct NativeRenderer {
    config: RenderConfig,
}

impl NativeRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

async fn blocking<F>(task: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let panic = e.into_panic();
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            anyhow::bail!("Rendering panicked: {}", message)
        }
        Err(e) => Err(e).context("Rendering task was cancelled"),
    }
}

/// Image format implied by an output path's extension
pub fn format_for(output: &Path) -> Result<ImageFormat> {
    let extension = output
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| anyhow::anyhow!("Output {} has no file extension", output.display()))?;

    ImageFormat::from_extension(extension)
        .filter(|format| format.writing_enabled())
        .ok_or_else(|| anyhow::anyhow!("Unsupported image format '{}'", extension))
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    check_file_accessible(path)?;
    image::open(path).with_context(|| format!("Failed to decode image {}", path.display()))
}

fn convert_image(input: &Path, output: &Path) -> Result<()> {
    ensure_distinct(input, output)?;
    let format = format_for(output)?;
    let img = open_image(input)?;

    // Formats without an alpha channel reject RGBA buffers
    let img = match format {
        ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Pnm => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    img.save_with_format(output, format)
        .with_context(|| format!("Failed to write {}", output.display()))
}

fn image_to_pdf(input: &Path, output: &Path) -> Result<()> {
    let rgb = open_image(input)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        },
        rgb.into_raw(),
    ));

    // One point per pixel: the page is exactly the image
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let page_id = add_page(&mut doc, pages_id, resources_id, &content, (width as i64, height as i64))?;
    finish_document(doc, pages_id, vec![page_id], output)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    content: &Content,
    (width, height): (i64, i64),
) -> Result<ObjectId> {
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
    }))
}

fn finish_document(mut doc: Document, pages_id: ObjectId, page_ids: Vec<ObjectId>, output: &Path) -> Result<()> {
    let count = page_ids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
        "Count" => Object::Integer(count),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Split text into lines no wider than `columns` characters
pub fn wrap_lines(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.trim_end().chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(columns.max(1)) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}

/// Helvetica only covers Latin-1; anything else becomes '?'
fn latin1(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

fn text_to_pdf(text: &str, output: &Path) -> Result<()> {
    let lines = wrap_lines(text, WRAP_COLUMNS);
    let per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids = Vec::new();
    // An empty file still yields one blank page
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(per_page).collect()
    };

    for chunk in chunks {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)]),
            Operation::new("TL", vec![Object::Integer(LEADING)]),
            Operation::new(
                "Td",
                vec![Object::Integer(MARGIN), Object::Integer(PAGE_HEIGHT - MARGIN - FONT_SIZE)],
            ),
        ];
        for line in chunk {
            operations.push(Operation::new("Tj", vec![Object::string_literal(latin1(line))]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        page_ids.push(add_page(&mut doc, pages_id, resources_id, &content, (PAGE_WIDTH, PAGE_HEIGHT))?);
    }

    finish_document(doc, pages_id, page_ids, output)
}

fn image_to_docx(input: &Path, output: &Path) -> Result<()> {
    check_file_accessible(input)?;
    let (width, height) = image::image_dimensions(input)
        .with_context(|| format!("Failed to read image size of {}", input.display()))?;
    let bytes = fs_err::read(input)?;

    let mut width_emu = width.saturating_mul(EMU_PER_PIXEL);
    let mut height_emu = height.saturating_mul(EMU_PER_PIXEL);
    if width_emu > DOCX_MAX_WIDTH_EMU {
        let scale = DOCX_MAX_WIDTH_EMU as f64 / width_emu as f64;
        width_emu = DOCX_MAX_WIDTH_EMU;
        height_emu = (height_emu as f64 * scale) as u32;
    }

    let pic = Pic::new(&bytes).size(width_emu, height_emu);
    let file = fs_err::File::create(output)?;
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)))
        .build()
        .pack(file)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output.display(), e))?;

    Ok(())
}

fn load_font(path: &Path) -> Result<FontVec> {
    let data = fs_err::read(path).context("Failed to load the font used for text rendering")?;
    FontVec::try_from_vec(data).map_err(|_| anyhow::anyhow!("Invalid font file: {}", path.display()))
}

fn text_to_image(text: &str, output: &Path, config: &RenderConfig) -> Result<()> {
    let font = load_font(&config.font_path)?;
    let scale = PxScale::from(config.font_size);
    let lines: Vec<&str> = text.lines().collect();

    let line_height = config.font_size.ceil() as u32;
    let mut width = 0u32;
    for line in &lines {
        let (w, _) = text_size(scale, &font, line);
        width = width.max(w);
    }
    let width = width + 2 * TEXT_IMAGE_PADDING;
    let height = lines.len() as u32 * (line_height + TEXT_IMAGE_LINE_GAP) + 2 * TEXT_IMAGE_PADDING;

    let mut img = RgbImage::from_pixel(width.max(1), height.max(1), Rgb([255, 255, 255]));
    let mut y = TEXT_IMAGE_PADDING as i32;
    for line in &lines {
        draw_text_mut(&mut img, Rgb([0, 0, 0]), TEXT_IMAGE_PADDING as i32, y, scale, &font, line);
        y += (line_height + TEXT_IMAGE_LINE_GAP) as i32;
    }

    img.save_with_format(output, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", output.display()))
}

#[async_trait]
impl DocumentRenderer for NativeRenderer {
    async fn image_to_pdf(&self, image: &Path, output: &Path) -> Result<()> {
        let (input, output) = (image.to_path_buf(), output.to_path_buf());
        blocking(move || image_to_pdf(&input, &output)).await
    }

    async fn image_to_docx(&self, image: &Path, output: &Path) -> Result<()> {
        let (input, output) = (image.to_path_buf(), output.to_path_buf());
        blocking(move || image_to_docx(&input, &output)).await
    }

    async fn convert_image(&self, image: &Path, output: &Path) -> Result<()> {
        let (input, output) = (image.to_path_buf(), output.to_path_buf());
        blocking(move || convert_image(&input, &output)).await
    }

    async fn text_to_pdf(&self, text: &str, output: &Path) -> Result<()> {
        let (text, output) = (text.to_string(), output.to_path_buf());
        blocking(move || text_to_pdf(&text, &output)).await
    }

    async fn text_to_image(&self, text: &str, output: &Path) -> Result<()> {
        let (text, output): (String, PathBuf) = (text.to_string(), output.to_path_buf());
        let config = self.config.clone();
        blocking(move || text_to_image(&text, &output, &config)).await
    }
}
