//! Fixed JavaScript runtime shipped with every generated page, and the HTML
//! document around it.

/// Drawing primitives, value helpers and the image-load barrier.
/// Value semantics mirror `runtime::value`: truthiness, tolerant `==`,
/// `String(v)` coercion with `null` array slots printing empty.
pub const PREAMBLE: &str = r#"const __canvas = document.getElementById("kuromi");
const __ctx = __canvas.getContext("2d");
const __keys = new Set();
const __images = Object.create(null);
const __PALETTE = new Map([
    ["red", "red"], ["green", "green"], ["blue", "blue"], ["yellow", "yellow"],
    ["cyan", "cyan"], ["magenta", "magenta"], ["white", "white"], ["black", "black"],
    ["gray", "gray"], ["grey", "gray"],
]);

function __keyName(e) {
    return e.key === " " ? "SPACE" : e.key.toUpperCase();
}
window.addEventListener("keydown", (e) => __keys.add(__keyName(e)));
window.addEventListener("keyup", (e) => __keys.delete(__keyName(e)));
window.addEventListener("blur", () => __keys.clear());

// ─── Values ───────────────────────────────────────────────────────────────

function __fail(message) {
    throw new Error(message);
}

function __str(v) {
    if (v === null || v === undefined) return "null";
    if (Array.isArray(v)) return v.map((x) => (x === null || x === undefined ? "" : __str(x))).join(",");
    if (typeof v === "function") return "function " + v.name.replace(/^\$/, "").replace(/\$\d+$/, "");
    return String(v);
}

function __truthy(v) {
    if (v === null || v === undefined) return false;
    if (typeof v === "boolean") return v;
    if (typeof v === "number") return v !== 0;
    if (typeof v === "string") return v.length > 0;
    return true;
}

function __eq(a, b) {
    if (a === undefined) a = null;
    if (b === undefined) b = null;
    if (typeof a === "number" && typeof b === "number") return Math.abs(a - b) < 1e-4;
    return a === b;
}

function __ne(a, b) {
    return !__eq(a, b);
}

function __add(a, b) {
    if (typeof a === "string" || typeof b === "string") return __str(a) + __str(b);
    if (typeof a !== "number" || typeof b !== "number") __fail("operator `+` needs numbers or a string");
    return a + b;
}

function __color(v) {
    return __PALETTE.get(__str(v).toLowerCase()) ?? "black";
}

function __index(t, i) {
    if (!Array.isArray(t) && typeof t !== "string") __fail("cannot index " + __str(t));
    if (typeof i !== "number") __fail("index must be a number");
    const items = typeof t === "string" ? [...t] : t;
    if (!Number.isInteger(i) || i < 0 || i >= items.length) {
        __fail("index " + i + " out of bounds for length " + items.length);
    }
    return items[i];
}

function __array(v) {
    if (!Array.isArray(v)) __fail("`for` expects an array");
    return v;
}

// ─── Builtins ─────────────────────────────────────────────────────────────

function __isKeyPressed(key) {
    return __keys.has(__str(key).toUpperCase());
}

function __random(min, max) {
    return min + Math.random() * (max - min);
}

function __len(v) {
    if (Array.isArray(v)) return v.length;
    if (typeof v === "string") return [...v].length;
    __fail("`len` expects an array or string");
}

// ─── Drawing ──────────────────────────────────────────────────────────────

function __clear() {
    __ctx.fillStyle = "black";
    __ctx.fillRect(0, 0, __canvas.width, __canvas.height);
}

function __fillRect(x, y, w, h, c) {
    __ctx.fillStyle = __color(c);
    __ctx.fillRect(x, y, w, h);
}

function __fillCircle(x, y, r, c) {
    __ctx.fillStyle = __color(c);
    __ctx.beginPath();
    __ctx.arc(x, y, Math.max(r, 0), 0, Math.PI * 2);
    __ctx.fill();
}

function __drawLine(x1, y1, x2, y2, c) {
    __ctx.strokeStyle = __color(c);
    __ctx.lineWidth = 2;
    __ctx.beginPath();
    __ctx.moveTo(x1, y1);
    __ctx.lineTo(x2, y2);
    __ctx.stroke();
}

function __fillTriangle(x1, y1, x2, y2, x3, y3, c) {
    __ctx.fillStyle = __color(c);
    __ctx.beginPath();
    __ctx.moveTo(x1, y1);
    __ctx.lineTo(x2, y2);
    __ctx.lineTo(x3, y3);
    __ctx.closePath();
    __ctx.fill();
}

function __drawText(text, x, y, align) {
    __ctx.fillStyle = "white";
    __ctx.font = "16px sans-serif";
    __ctx.textAlign = align;
    __ctx.textBaseline = "alphabetic";
    __ctx.fillText(__str(text), x, y);
}

function __drawImage(img, x, y) {
    if (!(img instanceof HTMLImageElement)) __fail("`draw image` expects an image");
    if (img.complete && img.naturalWidth > 0) __ctx.drawImage(img, x, y);
}

// ─── Output and assets ────────────────────────────────────────────────────

function __log(v) {
    console.log(__str(v));
}

function __play(path) {
    const audio = new Audio(__ASSET_DIR + path);
    audio.play().catch((e) => console.warn("sound not played: " + path, e));
}

function __loadImages(paths, main) {
    let pending = paths.length;
    if (pending === 0) {
        main();
        return;
    }
    const settle = () => {
        pending -= 1;
        if (pending === 0) main();
    };
    for (const path of paths) {
        const img = new Image();
        img.addEventListener("load", settle);
        img.addEventListener("error", () => {
            // `load` then reads undefined and `draw image` fails on it
            console.warn("image failed to load: " + path);
            delete __images[path];
            settle();
        });
        img.src = __ASSET_DIR + path;
        __images[path] = img;
    }
}
"#;

/// Wraps a generated script in a standalone page.
pub fn html_document(title: &str, width: u64, height: u64, asset_dir: &str, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ margin: 0; background: #111; }}
canvas {{ display: block; margin: 0 auto; }}
</style>
</head>
<body>
<canvas id="kuromi" width="{width}" height="{height}"></canvas>
<script>
"use strict";
const __ASSET_DIR = {asset_dir};
{PREAMBLE}
{script}</script>
</body>
</html>
"#,
        title = escape_html(title),
        asset_dir = super::js_string(asset_dir),
    )
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
