//! 快照标注: 合规绿框,违规红框,框上方色条写状态文字

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::compliance::ComplianceVerdict;
use crate::config::AnnotateConfig;
use crate::detection::types::BBox;

pub const SAFE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const VIOLATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// 线宽 (像素)
const THICKNESS: i32 = 2;
/// 色条内边距 (像素)
const PADDING: u32 = 2;

/// 配置字体缺失时依次尝试的系统字体
const FALLBACK_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 标签文字: `SAFE` 或 `VIOLATION [Helmet,Boots]`
pub fn verdict_label(verdict: &ComplianceVerdict) -> String {
    if verdict.is_compliant() {
        "SAFE".to_string()
    } else {
        format!("VIOLATION [{}]", verdict.labels().join(","))
    }
}

fn verdict_color(verdict: &ComplianceVerdict) -> Rgb<u8> {
    if verdict.is_compliant() {
        SAFE_COLOR
    } else {
        VIOLATION_COLOR
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = std::fs::read(path).ok()?;
    // .ttc 取第一个字体
    match FontVec::try_from_vec_and_index(bytes, 0) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("⚠️ 字体解析失败 {}: {}", path.display(), e);
            None
        }
    }
}

/// 快照标注器
///
/// 没有可用字体时仍画出色条,只是不写文字
pub struct Annotator {
    font: Option<FontVec>,
    scale: PxScale,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            font: None,
            scale: PxScale::from(AnnotateConfig::default().font_size),
        }
    }
}

impl Annotator {
    pub fn new(config: &AnnotateConfig) -> Self {
        let candidates = std::iter::once(config.font_path.as_path())
            .chain(FALLBACK_FONTS.iter().map(Path::new));

        let mut font = None;
        for path in candidates {
            if let Some(loaded) = load_font(path) {
                info!("✅ 标注字体加载成功: {}", path.display());
                font = Some(loaded);
                break;
            }
        }
        if font.is_none() {
            warn!("⚠️ 未找到标注字体: {}, 快照只画色条", config.font_path.display());
        }

        Self {
            font,
            scale: PxScale::from(config.font_size),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 色条尺寸 (宽, 高)
    fn label_size(&self, label: &str) -> (u32, u32) {
        let height = self.scale.y.ceil() as u32 + 2 * PADDING;
        let text_width = match &self.font {
            Some(font) => text_size(self.scale, font, label).0,
            // 按平均字宽估算
            None => (label.chars().count() as f32 * self.scale.x * 0.6).ceil() as u32,
        };
        (text_width + 2 * PADDING, height)
    }

    /// 画出人体框与状态色条
    ///
    /// 色条放在框的上方; 框贴近图像顶边时放进框内
    pub fn annotate_person(
        &self,
        image: &mut RgbImage,
        bbox: &BBox,
        verdict: &ComplianceVerdict,
    ) {
        let color = verdict_color(verdict);

        let x = bbox.x1 as i32;
        let y = bbox.y1 as i32;
        let w = bbox.width() as i32;
        let h = bbox.height() as i32;
        if w <= 0 || h <= 0 {
            return;
        }

        for i in 0..THICKNESS {
            let (rw, rh) = (w - 2 * i, h - 2 * i);
            if rw <= 0 || rh <= 0 {
                break;
            }
            let rect = Rect::at(x + i, y + i).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(image, rect, color);
        }

        let label = verdict_label(verdict);
        let (bar_w, bar_h) = self.label_size(&label);
        let bar_y = if y >= bar_h as i32 { y - bar_h as i32 } else { y };
        draw_filled_rect_mut(image, Rect::at(x, bar_y).of_size(bar_w, bar_h), color);

        if let Some(font) = &self.font {
            let offset = PADDING as i32;
            draw_text_mut(
                image,
                TEXT_COLOR,
                x + offset,
                bar_y + offset,
                self.scale,
                font,
                &label,
            );
        }
    }
}
