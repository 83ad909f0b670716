//! Built-in stock icons.
//!
//! Used when no real icon can be decoded for an entry: plain folders, most
//! executables on non-Windows hosts, and as the placeholder after a failed
//! extraction. Glyphs are described on a 16x16 grid and rasterized at any
//! size.

use std::path::Path;

use image::{Rgba, RgbaImage};

/// Grid the glyphs are designed on.
const GRID: f32 = 16.0;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const FOLDER_BACK: Rgba<u8> = Rgba([214, 160, 42, 255]);
const FOLDER_FRONT: Rgba<u8> = Rgba([248, 200, 80, 255]);
const ARROW: Rgba<u8> = Rgba([90, 60, 10, 255]);
const PAGE: Rgba<u8> = Rgba([250, 250, 250, 255]);
const PAGE_EDGE: Rgba<u8> = Rgba([130, 130, 130, 255]);
const TEXT_LINE: Rgba<u8> = Rgba([170, 170, 170, 255]);
const TITLE_BAR: Rgba<u8> = Rgba([40, 110, 200, 255]);
const CONSOLE: Rgba<u8> = Rgba([30, 30, 30, 255]);
const PROMPT: Rgba<u8> = Rgba([80, 220, 90, 255]);
const LINK_BADGE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LINK_ARROW: Rgba<u8> = Rgba([20, 90, 200, 255]);
const MISSING: Rgba<u8> = Rgba([200, 60, 60, 255]);

/// Stock icon kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockIcon {
    /// Plain folder
    Folder,
    /// Submenu folder (folder with an arrow)
    Submenu,
    /// Executable program
    Application,
    /// Shortcut or URL
    Shortcut,
    /// Batch or shell script
    Script,
    /// Anything else
    Document,
    /// Shown when extraction failed
    Missing,
}

impl StockIcon {
    /// Pick the stock icon for a file by its extension.
    #[must_use]
    pub fn for_file(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "exe" | "com" | "msi" | "app" | "appimage" => Self::Application,
            "lnk" | "url" | "desktop" => Self::Shortcut,
            "bat" | "cmd" | "vbs" | "ps1" | "sh" | "py" => Self::Script,
            _ => Self::Document,
        }
    }

    /// Rasterize the glyph at `size` x `size` pixels (straight alpha).
    #[must_use]
    pub fn render(self, size: u32) -> RgbaImage {
        let mut canvas = Canvas::new(size);
        match self {
            Self::Folder => canvas.folder(),
            Self::Submenu => {
                canvas.folder();
                canvas.fill(7.0, 7.0, 9.0, 13.0, ARROW);
                canvas.fill(9.0, 8.0, 10.0, 12.0, ARROW);
                canvas.fill(10.0, 9.0, 11.0, 11.0, ARROW);
            }
            Self::Application => {
                canvas.fill(1.0, 2.0, 15.0, 14.0, PAGE_EDGE);
                canvas.fill(2.0, 5.0, 14.0, 13.0, PAGE);
                canvas.fill(2.0, 3.0, 14.0, 5.0, TITLE_BAR);
            }
            Self::Shortcut => {
                canvas.page();
                canvas.fill(1.0, 9.0, 8.0, 16.0, LINK_BADGE);
                canvas.fill(2.0, 10.0, 7.0, 15.0, PAGE_EDGE);
                canvas.fill(3.0, 11.0, 6.0, 14.0, LINK_BADGE);
                canvas.fill(3.0, 13.0, 4.0, 14.0, LINK_ARROW);
                canvas.fill(4.0, 12.0, 5.0, 13.0, LINK_ARROW);
                canvas.fill(4.0, 11.0, 6.0, 12.0, LINK_ARROW);
                canvas.fill(5.0, 11.0, 6.0, 13.0, LINK_ARROW);
            }
            Self::Script => {
                canvas.fill(1.0, 2.0, 15.0, 14.0, CONSOLE);
                canvas.fill(3.0, 5.0, 4.0, 6.0, PROMPT);
                canvas.fill(4.0, 6.0, 5.0, 7.0, PROMPT);
                canvas.fill(3.0, 7.0, 4.0, 8.0, PROMPT);
                canvas.fill(6.0, 7.0, 10.0, 8.0, PROMPT);
            }
            Self::Document => canvas.page(),
            Self::Missing => {
                canvas.page();
                canvas.fill(6.0, 4.0, 10.0, 10.0, MISSING);
                canvas.fill(6.0, 11.0, 10.0, 13.0, MISSING);
            }
        }
        canvas.image
    }
}

/// Rasterizer for glyphs described in grid units.
struct Canvas {
    image: RgbaImage,
    scale: f32,
}

impl Canvas {
    fn new(size: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(size, size, TRANSPARENT),
            scale: size as f32 / GRID,
        }
    }

    /// Fill the grid rectangle `[x0, x1) x [y0, y1)`.
    fn fill(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
        let size = self.image.width();
        let to_px = |v: f32| ((v * self.scale).round() as u32).min(size);
        let (px0, px1) = (to_px(x0), to_px(x1).max(to_px(x0) + 1).min(size));
        let (py0, py1) = (to_px(y0), to_px(y1).max(to_px(y0) + 1).min(size));
        for y in py0..py1 {
            for x in px0..px1 {
                self.image.put_pixel(x, y, color);
            }
        }
    }

    fn folder(&mut self) {
        self.fill(1.0, 2.0, 7.0, 4.0, FOLDER_BACK);
        self.fill(1.0, 3.0, 15.0, 14.0, FOLDER_BACK);
        self.fill(1.0, 5.0, 15.0, 14.0, FOLDER_FRONT);
    }

    fn page(&mut self) {
        self.fill(3.0, 1.0, 13.0, 15.0, PAGE_EDGE);
        self.fill(4.0, 2.0, 12.0, 14.0, PAGE);
        for row in [5.0, 7.0, 9.0, 11.0] {
            self.fill(5.0, row, 11.0, row + 1.0, TEXT_LINE);
        }
    }
}
