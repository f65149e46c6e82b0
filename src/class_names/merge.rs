//! Utility class 冲突合并
//!
//! 从后往前扫描：每个 class 占据 (variants, important, group) 槽位，
//! 后出现的 class 优先，先出现的同组 class 被丢弃。

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
    static ref FRACTION: Regex = Regex::new(r"^\d+/\d+$").unwrap();
    static ref TSHIRT: Regex = Regex::new(r"^(\d+)?(xs|sm|md|lg|xl)$").unwrap();
    static ref LENGTH: Regex = Regex::new(
        r"^-?\d*\.?\d+(px|rem|em|%|vh|vw|svh|svw|lvh|lvw|dvh|dvw|ch|ex|pt|pc|cm|mm|in|lh|vmin|vmax)$"
    )
    .unwrap();
    static ref COLOR_HEX: Regex = Regex::new(r"^#([0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap();
    static ref COLOR_FN: Regex = Regex::new(r"^(rgb|rgba|hsl|hsla|hwb|lab|lch|oklab|oklch|color)\(").unwrap();

    /// 独立 class → 组
    static ref KEYWORDS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for k in [
            "block", "inline-block", "inline", "flex", "inline-flex", "table", "inline-table",
            "table-caption", "table-cell", "table-column", "table-column-group",
            "table-footer-group", "table-header-group", "table-row-group", "table-row",
            "flow-root", "grid", "inline-grid", "contents", "list-item", "hidden",
        ] {
            m.insert(k, "display");
        }
        for k in ["static", "fixed", "absolute", "relative", "sticky"] {
            m.insert(k, "position");
        }
        for k in ["visible", "invisible", "collapse"] {
            m.insert(k, "visibility");
        }
        for k in ["italic", "not-italic"] {
            m.insert(k, "font-style");
        }
        for k in ["underline", "overline", "line-through", "no-underline"] {
            m.insert(k, "text-decoration");
        }
        for k in ["uppercase", "lowercase", "capitalize", "normal-case"] {
            m.insert(k, "text-transform");
        }
        for k in ["flex-row", "flex-row-reverse", "flex-col", "flex-col-reverse"] {
            m.insert(k, "flex-direction");
        }
        for k in ["flex-wrap", "flex-wrap-reverse", "flex-nowrap"] {
            m.insert(k, "flex-wrap");
        }
        for k in ["sr-only", "not-sr-only"] {
            m.insert(k, "sr");
        }
        for k in ["isolate", "isolation-auto"] {
            m.insert(k, "isolation");
        }
        for k in ["box-border", "box-content"] {
            m.insert(k, "box-sizing");
        }
        for k in ["antialiased", "subpixel-antialiased"] {
            m.insert(k, "font-smoothing");
        }
        m.insert("truncate", "text-overflow");
        m
    };

    /// 前缀规则，按前缀长度降序，保证 `inset-x` 先于 `inset` 匹配
    static ref PREFIXES: Vec<(&'static str, Rule)> = {
        let mut rules = vec![
            ("p", Rule::Spacing("p")),
            ("px", Rule::Spacing("px")),
            ("py", Rule::Spacing("py")),
            ("pt", Rule::Spacing("pt")),
            ("pr", Rule::Spacing("pr")),
            ("pb", Rule::Spacing("pb")),
            ("pl", Rule::Spacing("pl")),
            ("ps", Rule::Spacing("ps")),
            ("pe", Rule::Spacing("pe")),
            ("m", Rule::Spacing("m")),
            ("mx", Rule::Spacing("mx")),
            ("my", Rule::Spacing("my")),
            ("mt", Rule::Spacing("mt")),
            ("mr", Rule::Spacing("mr")),
            ("mb", Rule::Spacing("mb")),
            ("ml", Rule::Spacing("ml")),
            ("ms", Rule::Spacing("ms")),
            ("me", Rule::Spacing("me")),
            ("gap", Rule::Spacing("gap")),
            ("gap-x", Rule::Spacing("gap-x")),
            ("gap-y", Rule::Spacing("gap-y")),
            ("space-x", Rule::Spacing("space-x")),
            ("space-y", Rule::Spacing("space-y")),
            ("w", Rule::Sizing("w")),
            ("h", Rule::Sizing("h")),
            ("size", Rule::Sizing("size")),
            ("min-w", Rule::Sizing("min-w")),
            ("min-h", Rule::Sizing("min-h")),
            ("max-w", Rule::Sizing("max-w")),
            ("max-h", Rule::Sizing("max-h")),
            ("basis", Rule::Sizing("basis")),
            ("inset", Rule::Sizing("inset")),
            ("inset-x", Rule::Sizing("inset-x")),
            ("inset-y", Rule::Sizing("inset-y")),
            ("top", Rule::Sizing("top")),
            ("right", Rule::Sizing("right")),
            ("bottom", Rule::Sizing("bottom")),
            ("left", Rule::Sizing("left")),
            ("start", Rule::Sizing("start")),
            ("end", Rule::Sizing("end")),
            ("translate-x", Rule::Sizing("translate-x")),
            ("translate-y", Rule::Sizing("translate-y")),
            ("z", Rule::Any("z")),
            ("opacity", Rule::Any("opacity")),
            ("order", Rule::Any("order")),
            ("leading", Rule::Any("leading")),
            ("tracking", Rule::Any("tracking")),
            ("cursor", Rule::Any("cursor")),
            ("whitespace", Rule::Any("whitespace")),
            ("break", Rule::Any("word-break")),
            ("line-clamp", Rule::Any("line-clamp")),
            ("grow", Rule::Bare("grow")),
            ("shrink", Rule::Bare("shrink")),
            ("flex", Rule::Any("flex")),
            ("flex-grow", Rule::Bare("grow")),
            ("flex-shrink", Rule::Bare("shrink")),
            ("grid-cols", Rule::Any("grid-cols")),
            ("grid-rows", Rule::Any("grid-rows")),
            ("col", Rule::Any("col")),
            ("col-span", Rule::Any("col-span")),
            ("col-start", Rule::Any("col-start")),
            ("col-end", Rule::Any("col-end")),
            ("row-span", Rule::Any("row-span")),
            ("row-start", Rule::Any("row-start")),
            ("row-end", Rule::Any("row-end")),
            ("items", Rule::Any("align-items")),
            ("justify", Rule::Any("justify-content")),
            ("justify-items", Rule::Any("justify-items")),
            ("justify-self", Rule::Any("justify-self")),
            ("self", Rule::Any("align-self")),
            ("place-items", Rule::Any("place-items")),
            ("place-content", Rule::Any("place-content")),
            ("place-self", Rule::Any("place-self")),
            ("overflow", Rule::Any("overflow")),
            ("overflow-x", Rule::Any("overflow-x")),
            ("overflow-y", Rule::Any("overflow-y")),
            ("object", Rule::Any("object")),
            ("aspect", Rule::Any("aspect")),
            ("align", Rule::Any("vertical-align")),
            ("select", Rule::Any("select")),
            ("pointer-events", Rule::Any("pointer-events")),
            ("resize", Rule::Bare("resize")),
            ("transition", Rule::Bare("transition")),
            ("duration", Rule::Any("duration")),
            ("ease", Rule::Any("ease")),
            ("delay", Rule::Any("delay")),
            ("animate", Rule::Any("animate")),
            ("rotate", Rule::Any("rotate")),
            ("scale", Rule::Any("scale")),
            ("scale-x", Rule::Any("scale-x")),
            ("scale-y", Rule::Any("scale-y")),
            ("fill", Rule::Any("fill")),
            ("stroke", Rule::Stroke),
            ("from", Rule::Any("gradient-from")),
            ("via", Rule::Any("gradient-via")),
            ("to", Rule::Any("gradient-to")),
            ("outline-offset", Rule::Any("outline-offset")),
            ("text", Rule::Text),
            ("font", Rule::Font),
            ("bg", Rule::Background),
            ("bg-opacity", Rule::Any("bg-opacity")),
            ("text-opacity", Rule::Any("text-opacity")),
            ("border-opacity", Rule::Any("border-opacity")),
            ("ring-opacity", Rule::Any("ring-opacity")),
            ("border", Rule::Border("border-w", "border-color")),
            ("border-x", Rule::Border("border-w-x", "border-color-x")),
            ("border-y", Rule::Border("border-w-y", "border-color-y")),
            ("border-t", Rule::Border("border-w-t", "border-color-t")),
            ("border-r", Rule::Border("border-w-r", "border-color-r")),
            ("border-b", Rule::Border("border-w-b", "border-color-b")),
            ("border-l", Rule::Border("border-w-l", "border-color-l")),
            ("border-s", Rule::Border("border-w-s", "border-color-s")),
            ("border-e", Rule::Border("border-w-e", "border-color-e")),
            ("rounded", Rule::Rounded("rounded")),
            ("rounded-t", Rule::Rounded("rounded-t")),
            ("rounded-r", Rule::Rounded("rounded-r")),
            ("rounded-b", Rule::Rounded("rounded-b")),
            ("rounded-l", Rule::Rounded("rounded-l")),
            ("rounded-s", Rule::Rounded("rounded-s")),
            ("rounded-e", Rule::Rounded("rounded-e")),
            ("rounded-tl", Rule::Rounded("rounded-tl")),
            ("rounded-tr", Rule::Rounded("rounded-tr")),
            ("rounded-br", Rule::Rounded("rounded-br")),
            ("rounded-bl", Rule::Rounded("rounded-bl")),
            ("shadow", Rule::Shadow),
            ("ring", Rule::Ring),
            ("ring-offset", Rule::RingOffset),
            ("outline", Rule::Outline),
        ];
        rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        rules
    };

    /// 一个组会覆盖的其他组（例如 `p-4` 覆盖之前的 `px-2`）
    static ref CONFLICTS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("p", vec!["px", "py", "pt", "pr", "pb", "pl", "ps", "pe"]);
        m.insert("px", vec!["pr", "pl"]);
        m.insert("py", vec!["pt", "pb"]);
        m.insert("m", vec!["mx", "my", "mt", "mr", "mb", "ml", "ms", "me"]);
        m.insert("mx", vec!["mr", "ml"]);
        m.insert("my", vec!["mt", "mb"]);
        m.insert("gap", vec!["gap-x", "gap-y"]);
        m.insert("size", vec!["w", "h"]);
        m.insert(
            "inset",
            vec!["inset-x", "inset-y", "top", "right", "bottom", "left", "start", "end"],
        );
        m.insert("inset-x", vec!["right", "left"]);
        m.insert("inset-y", vec!["top", "bottom"]);
        m.insert("overflow", vec!["overflow-x", "overflow-y"]);
        m.insert("scale", vec!["scale-x", "scale-y"]);
        m.insert("font-size", vec!["leading"]);
        m.insert(
            "border-w",
            vec![
                "border-w-x", "border-w-y", "border-w-t", "border-w-r", "border-w-b",
                "border-w-l", "border-w-s", "border-w-e",
            ],
        );
        m.insert("border-w-x", vec!["border-w-r", "border-w-l"]);
        m.insert("border-w-y", vec!["border-w-t", "border-w-b"]);
        m.insert(
            "border-color",
            vec![
                "border-color-x", "border-color-y", "border-color-t", "border-color-r",
                "border-color-b", "border-color-l", "border-color-s", "border-color-e",
            ],
        );
        m.insert("border-color-x", vec!["border-color-r", "border-color-l"]);
        m.insert("border-color-y", vec!["border-color-t", "border-color-b"]);
        m.insert(
            "rounded",
            vec![
                "rounded-t", "rounded-r", "rounded-b", "rounded-l", "rounded-s", "rounded-e",
                "rounded-tl", "rounded-tr", "rounded-br", "rounded-bl",
            ],
        );
        m.insert("rounded-t", vec!["rounded-tl", "rounded-tr"]);
        m.insert("rounded-r", vec!["rounded-tr", "rounded-br"]);
        m.insert("rounded-b", vec!["rounded-br", "rounded-bl"]);
        m.insert("rounded-l", vec!["rounded-tl", "rounded-bl"]);
        m
    };
}

const FONT_SIZES: &[&str] = &[
    "xs", "sm", "base", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl", "7xl", "8xl", "9xl",
];
const FONT_WEIGHTS: &[&str] = &[
    "thin", "extralight", "light", "normal", "medium", "semibold", "bold", "extrabold", "black",
];
const TEXT_ALIGN: &[&str] = &["left", "center", "right", "justify", "start", "end"];
const BORDER_STYLES: &[&str] = &["solid", "dashed", "dotted", "double", "hidden", "none"];
const SIZE_KEYWORDS: &[&str] = &[
    "auto", "px", "full", "screen", "min", "max", "fit", "svw", "svh", "lvw", "lvh", "dvw",
    "dvh", "none", "prose",
];

/// 前缀对应的分类规则
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// 任意非空值
    Any(&'static str),
    /// 允许无值（如 `grow`）
    Bare(&'static str),
    /// 间距刻度：数字、`px`、`auto`、任意值
    Spacing(&'static str),
    /// 尺寸：间距刻度 + 分数 + 关键字
    Sizing(&'static str),
    Text,
    Font,
    Background,
    Border(&'static str, &'static str),
    Rounded(&'static str),
    Shadow,
    Stroke,
    Ring,
    RingOffset,
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArbitraryKind {
    Length,
    Number,
    Color,
    Other,
}

/// 拆分后的单个 class
#[derive(Debug)]
struct ParsedClass<'a> {
    variants: Vec<&'a str>,
    important: bool,
    base: &'a str,
}

impl<'a> ParsedClass<'a> {
    fn parse(token: &'a str) -> Self {
        let mut variants = split_variants(token);
        let last = variants.pop().unwrap_or(token);
        normalize_variants(&mut variants);

        let (important, base) = if let Some(rest) = last.strip_prefix('!') {
            (true, rest)
        } else if let Some(rest) = last.strip_suffix('!') {
            (true, rest)
        } else {
            (false, last)
        };

        Self {
            variants,
            important,
            base: base.strip_prefix('-').unwrap_or(base),
        }
    }

    fn slot(&self, group: &str) -> String {
        format!(
            "{}:{}{}",
            self.variants.join(":"),
            if self.important { "!" } else { "" },
            group
        )
    }
}

/// 合并 class 字符串，后出现的冲突 class 覆盖先出现的
pub fn merge_classes(input: &str) -> String {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());

    for token in tokens.iter().rev() {
        let parsed = ParsedClass::parse(token);

        match class_group(parsed.base) {
            Some(group) => {
                if !claimed.insert(parsed.slot(group)) {
                    continue;
                }
                if let Some(others) = CONFLICTS.get(group) {
                    for other in others {
                        claimed.insert(parsed.slot(other));
                    }
                }
            }
            None => {
                // 未知 class 只做精确去重
                if !claimed.insert(format!("={}", token)) {
                    continue;
                }
            }
        }

        kept.push(*token);
    }

    kept.reverse();
    kept.join(" ")
}

/// 按顶层 `:` 拆分变体，方括号与圆括号内的 `:` 不拆
fn split_variants(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in token.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            ':' if depth == 0 => {
                parts.push(&token[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&token[start..]);
    parts
}

/// 普通变体的先后顺序不影响冲突判断，任意变体 `[...]` 依赖位置，保持不动
fn normalize_variants(variants: &mut [&str]) {
    for run in variants.split_mut(|v| v.starts_with('[')) {
        run.sort_unstable();
    }
}

/// 识别 utility 所属的冲突组，未知 class 返回 None
fn class_group(base: &str) -> Option<&'static str> {
    if base.is_empty() {
        return None;
    }

    if let Some(group) = KEYWORDS.get(base) {
        return Some(*group);
    }

    // 任意属性 `[mask-type:luminance]` 只做精确去重
    if arbitrary(base).is_some() {
        return None;
    }

    for (prefix, rule) in PREFIXES.iter() {
        let prefix = *prefix;
        let value = if base == prefix {
            ""
        } else if let Some(rest) = base
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
        {
            rest
        } else {
            continue;
        };

        if let Some(group) = apply_rule(*rule, value) {
            return Some(group);
        }
    }

    None
}

fn apply_rule(rule: Rule, value: &str) -> Option<&'static str> {
    match rule {
        Rule::Any(group) => (!value.is_empty()).then_some(group),
        Rule::Bare(group) => Some(group),
        Rule::Spacing(group) => is_spacing(value).then_some(group),
        Rule::Sizing(group) => is_sizing(value).then_some(group),
        Rule::Text => classify_text(value),
        Rule::Font => classify_font(value),
        Rule::Background => classify_background(value),
        Rule::Border(width, color) => classify_border(value, width, color),
        Rule::Rounded(group) => {
            let ok = value.is_empty()
                || matches!(value, "none" | "full")
                || TSHIRT.is_match(value)
                || arbitrary(value).is_some();
            ok.then_some(group)
        }
        Rule::Shadow => {
            if value.is_empty() || matches!(value, "inner" | "none") || TSHIRT.is_match(value) {
                Some("shadow")
            } else {
                match arbitrary_kind(value) {
                    Some(ArbitraryKind::Color) | None => Some("shadow-color"),
                    Some(_) => Some("shadow"),
                }
            }
        }
        Rule::Stroke => {
            if value.is_empty() {
                None
            } else if is_width(value) {
                Some("stroke-w")
            } else {
                Some("stroke-color")
            }
        }
        Rule::Ring => {
            if value == "inset" {
                Some("ring-inset")
            } else if value.is_empty() || is_width(value) {
                Some("ring-w")
            } else {
                Some("ring-color")
            }
        }
        Rule::RingOffset => {
            if value.is_empty() {
                None
            } else if is_width(value) {
                Some("ring-offset-w")
            } else {
                Some("ring-offset-color")
            }
        }
        Rule::Outline => {
            if value.is_empty() || matches!(value, "none" | "dashed" | "dotted" | "double" | "solid")
            {
                Some("outline-style")
            } else if is_width(value) {
                Some("outline-w")
            } else {
                Some("outline-color")
            }
        }
    }
}

fn classify_text(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        return None;
    }
    if FONT_SIZES.contains(&value) {
        return Some("font-size");
    }
    if TEXT_ALIGN.contains(&value) {
        return Some("text-align");
    }
    // `text-sm/6`：字号带行高修饰
    if let Some((size, _)) = value.rsplit_once('/') {
        if FONT_SIZES.contains(&size) || arbitrary_kind(size) == Some(ArbitraryKind::Length) {
            return Some("font-size");
        }
    }
    match value {
        "ellipsis" | "clip" => return Some("text-overflow"),
        "wrap" | "nowrap" | "balance" | "pretty" => return Some("text-wrap"),
        _ => {}
    }
    match arbitrary_kind(value) {
        Some(ArbitraryKind::Length) => Some("font-size"),
        _ => Some("text-color"),
    }
}

fn classify_font(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        return None;
    }
    if FONT_WEIGHTS.contains(&value) {
        return Some("font-weight");
    }
    match arbitrary_kind(value) {
        Some(ArbitraryKind::Number) => Some("font-weight"),
        _ => Some("font-family"),
    }
}

fn classify_background(value: &str) -> Option<&'static str> {
    match value {
        "" => None,
        "fixed" | "local" | "scroll" => Some("bg-attachment"),
        "auto" | "cover" | "contain" => Some("bg-size"),
        "repeat" | "no-repeat" | "repeat-x" | "repeat-y" | "repeat-round" | "repeat-space" => {
            Some("bg-repeat")
        }
        "bottom" | "center" | "left" | "left-bottom" | "left-top" | "right" | "right-bottom"
        | "right-top" | "top" => Some("bg-position"),
        "none" => Some("bg-image"),
        v if v.starts_with("gradient-") || v.starts_with("[url(") => Some("bg-image"),
        _ => Some("bg-color"),
    }
}

fn classify_border(value: &str, width: &'static str, color: &'static str) -> Option<&'static str> {
    if value.is_empty() || is_width(value) {
        return Some(width);
    }
    if BORDER_STYLES.contains(&value) {
        return Some("border-style");
    }
    if matches!(value, "collapse" | "separate") {
        return Some("border-collapse");
    }
    Some(color)
}

fn arbitrary(value: &str) -> Option<&str> {
    value.strip_prefix('[')?.strip_suffix(']')
}

fn arbitrary_kind(value: &str) -> Option<ArbitraryKind> {
    let inner = arbitrary(value)?;

    let kind = if inner.starts_with("length:") || LENGTH.is_match(inner) {
        ArbitraryKind::Length
    } else if ["calc(", "min(", "max(", "clamp("]
        .iter()
        .any(|p| inner.starts_with(p))
    {
        ArbitraryKind::Length
    } else if inner.starts_with("number:") || NUMBER.is_match(inner) {
        ArbitraryKind::Number
    } else if inner.starts_with("color:") || COLOR_HEX.is_match(inner) || COLOR_FN.is_match(inner)
    {
        ArbitraryKind::Color
    } else {
        ArbitraryKind::Other
    };

    Some(kind)
}

/// 边框 / ring / outline 宽度：纯数字或长度任意值
fn is_width(value: &str) -> bool {
    NUMBER.is_match(value)
        || matches!(
            arbitrary_kind(value),
            Some(ArbitraryKind::Length) | Some(ArbitraryKind::Number)
        )
}

fn is_spacing(value: &str) -> bool {
    NUMBER.is_match(value) || matches!(value, "px" | "auto") || arbitrary(value).is_some()
}

fn is_sizing(value: &str) -> bool {
    is_spacing(value)
        || FRACTION.is_match(value)
        || SIZE_KEYWORDS.contains(&value)
        || TSHIRT.is_match(value)
        || value.starts_with("screen-")
}
