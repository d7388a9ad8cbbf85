//! Background form painter.
//!
//! The form graphics for a layout are rendered once, at first write,
//! into a byte string that is prefixed to every page's content stream:
//! tractor-feed holes, then the selected form body (color bars or a
//! scaled JPEG), then the 6- and 8-LPI line-number rulers.
//!
//! All coordinates are PDF points with the origin at the lower left;
//! inputs are inches measured from the top/left of the sheet.

use crate::config::{Config, FormType, PT};

// Standard tractor-feed geometry.  Not user-settable.
const HOLE_DIA: f64 = 0.1575;
const HOLE_VSP: f64 = 0.500;
const HOLE_HPOS: f64 = 0.236;
const HOLE_VOFS: f64 = 0.250;

const RGB_WHITE: &str = "1.000 1.000 1.000";
const RGB_HOLE_LINE: &str = "0.85 0.85 0.85";
const RGB_HOLE_FILL: &str = "0.90 0.90 0.90";

/// Bezier control offset approximating a circular quadrant.
const CIRCLE_K: f64 = 0.551784;

/// Format a PDF real operand: bare integers, fractions trimmed.
pub(crate) fn real(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.5}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Horizontal inches to page points.
fn xp(x: f64) -> f64 {
    x * PT
}

/// Vertical inches from sheet top to page points.
fn yp(cfg: &Config, y: f64) -> f64 {
    (cfg.len - y) * PT
}

/// Render the complete form background for this layout.
///
/// `image_dims` carries the JPEG pixel size when the form is an image;
/// the XObject itself is written separately, once per session.
pub fn build(cfg: &Config, image_dims: Option<(u32, u32)>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4096);

    holes(&mut buf, cfg);

    if cfg.formtype != FormType::Plain {
        buf.extend_from_slice(b" q ");
        match image_dims {
            Some((w, h)) if cfg.formtype == FormType::Image => image_placement(&mut buf, cfg, w, h),
            _ => bars(&mut buf, cfg),
        }
        buf.extend_from_slice(b" Q");
    }

    if cfg.lno > 0.0 {
        rulers(&mut buf, cfg);
    }

    buf
}

/// Stroke-and-fill the tractor-feed holes along both edges.
fn holes(buf: &mut Vec<u8>, cfg: &Config) {
    push_fmt(buf, format_args!(" q 1 w {} rg {} RG", RGB_HOLE_FILL, RGB_HOLE_LINE));

    let r = xp(HOLE_DIA / 2.0);
    let mut p = HOLE_VOFS;
    while p <= cfg.len - HOLE_VOFS {
        circle(buf, xp(HOLE_HPOS), yp(cfg, p), r);
        circle(buf, xp(cfg.wid - HOLE_HPOS), yp(cfg, p), r);
        p += HOLE_VSP;
    }
    buf.extend_from_slice(b" B Q");
}

/// A circle as four Bezier quadrants, appended as path segments.
fn circle(buf: &mut Vec<u8>, x: f64, y: f64, r: f64) {
    let k = CIRCLE_K * r;
    push_fmt(
        buf,
        format_args!(
            " {} {} m {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c",
            real(x - r),
            real(y),
            real(x - r),
            real(y + k),
            real(x - k),
            real(y + r),
            real(x),
            real(y + r),
            real(x + k),
            real(y + r),
            real(x + r),
            real(y + k),
            real(x + r),
            real(y),
            real(x + r),
            real(y - k),
            real(x + k),
            real(y - r),
            real(x),
            real(y - r),
            real(x - k),
            real(y - r),
            real(x - r),
            real(y - k),
            real(x - r),
            real(y),
        ),
    );
}

/// Rounded-rectangle border, optional ruler rules, and the alternating
/// color bars.
fn bars(buf: &mut Vec<u8>, cfg: &Config) {
    let color = cfg.formtype.colors();

    let tb = yp(cfg, cfg.top);
    let bb = yp(cfg, cfg.len - cfg.bot);
    let li = xp(cfg.margin);
    let ri = xp(cfg.wid - cfg.margin);
    let lo = li - xp(cfg.lno);
    let ro = ri + xp(cfg.lno);
    let cbr = xp(cfg.lno) / 2.0;
    let k = CIRCLE_K * cbr;

    // Border drawn clockwise as one closed path, inside left white.
    push_fmt(
        buf,
        format_args!(
            "1 w {} RG {} rg {} {} m {} {} {} {} {} {} c {} {} l {} {} {} {} {} {} c {} {} l {} {} {} {} {} {} c {} {} l {} {} {} {} {} {} c h",
            color.line,
            RGB_WHITE,
            real(lo),
            real(tb - cbr),
            real(lo),
            real(tb - cbr + k),
            real(lo + cbr - k),
            real(tb),
            real(lo + cbr),
            real(tb),
            real(ri),
            real(tb),
            real(ri + cbr + k),
            real(tb),
            real(ro),
            real(tb - cbr + k),
            real(ro),
            real(tb - cbr),
            real(ro),
            real(bb + cbr),
            real(ro),
            real(bb + cbr - k),
            real(ri + cbr + k),
            real(bb),
            real(ri + cbr),
            real(bb),
            real(li),
            real(bb),
            real(lo + cbr - k),
            real(bb),
            real(lo),
            real(bb + cbr - k),
            real(lo),
            real(bb + cbr),
        ),
    );

    // Rules separating the number columns from the data column.
    if cfg.lno > 0.0 {
        push_fmt(
            buf,
            format_args!(
                " {} {} m {} {} l {} {} m {} {} l",
                real(li),
                real(tb),
                real(li),
                real(bb),
                real(ri),
                real(bb),
                real(ri),
                real(tb),
            ),
        );
    }
    push_fmt(buf, format_args!(" B {} rg {} RG", color.bar, color.line));

    let nbars = ((cfg.len - (cfg.top + cfg.bot)) / cfg.barh + 0.5) as u32;
    for b in 0..nbars {
        let bart = tb - f64::from(b) * cfg.barh * PT;
        let barb = bart - cfg.barh * PT;
        if b % 2 == 0 {
            push_fmt(
                buf,
                format_args!(
                    " {} {} {} {} re",
                    real(li),
                    real(barb),
                    real(ri - li),
                    real(bart - barb),
                ),
            );
        }
    }
    buf.extend_from_slice(b" B");
}

/// Line-number rulers: 6 LPI down the left edge, 8 LPI down the right.
fn rulers(buf: &mut Vec<u8>, cfg: &Config) {
    let color = cfg.formtype.colors();

    let tb = yp(cfg, cfg.top);
    let li = xp(cfg.margin);
    let ri = xp(cfg.wid - cfg.margin);
    let lo = li - xp(cfg.lno);
    let span = cfg.len - (cfg.top + cfg.bot);

    let pt6 = (PT as u32) / 6;
    let pt8 = (PT as u32) / 8;

    push_fmt(
        buf,
        format_args!(
            " q 1 w BT 0 Tr {} rg /F3 {} Tf 55 Tz 1 0 0 1 {} {} Tm {} TL (6)' /F2 {} Tf",
            color.text,
            pt6,
            real(lo),
            real(tb + f64::from(pt6)),
            pt6,
            pt6,
        ),
    );
    for l in 1..=(span * 6.0).ceil() as u32 {
        push_fmt(buf, format_args!(" ({:2})'", l));
    }

    push_fmt(
        buf,
        format_args!(
            " /F3 {} Tf 1 0 0 1 {} {} Tm 65 Tz {} TL (8)' /F2 {} Tf",
            pt8,
            real(ri),
            real(tb + f64::from(pt8)),
            pt8,
            pt8,
        ),
    );
    for l in 1..=(span * 8.0).ceil() as u32 {
        push_fmt(buf, format_args!(" ({:2})'", l));
    }

    buf.extend_from_slice(b" ET Q");
}

/// Scale the form image to the printable width and center it
/// vertically; the XObject is registered as `/form` in every page's
/// resources.
fn image_placement(buf: &mut Vec<u8>, cfg: &Config, imgwid: u32, imghgt: u32) {
    let pw = cfg.wid - 2.0 * (cfg.margin + cfg.lno);
    let scale = pw / f64::from(imgwid);
    let sh = f64::from(imghgt) * scale * PT;
    let vpos = (cfg.len * PT - sh) / 2.0;
    push_fmt(
        buf,
        format_args!(
            " {} 0 0 {} {} {} cm /form Do",
            real(xp(pw)),
            real(sh),
            real(xp(cfg.margin + cfg.lno)),
            real(vpos),
        ),
    );
}

fn push_fmt(buf: &mut Vec<u8>, args: std::fmt::Arguments<'_>) {
    use std::io::Write;
    buf.write_fmt(args).expect("Vec write cannot fail");
}
