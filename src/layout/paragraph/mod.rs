//! # Paragraph Line Breaking
//!
//! A paragraph is formatted by walking its inline leaves left to right and
//! filling lines against the paragraph's right limit. The walk carries an
//! explicit [`LineBreakState`]; a copy of it is taken at every word start so
//! a word that overflows can be moved to the next line by restoring the
//! copy. Nothing about the paragraph is mutated: each formatted part is a
//! [`ParagraphFormatInfo`] holding the measured lines and the cursor where the
//! next area resumes.
//!
//! Rendering replays the same walk over each stored line. Justification is
//! computed only there, from the word width and blank count the measure
//! pass recorded after the last tab.

pub mod iterator;

use self::iterator::{first_leaf, font_for, hyperlink_for, next_leaf, node, LeafPos};
use super::area::{Rectangle, TOLERANCE};
use super::borders;
use super::info::LayoutInfo;
use super::shape;
use super::{FormatContext, RenderContext};
use crate::graphics::Pen;
use crate::model::{
    Alignment, BorderSide, Field, Font, Inline, LineSpacingRule, Paragraph, TabAlignment, TabLeader,
    TabStop, Underline,
};
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// Vertical metrics of one line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VerticalLineInfo {
    pub height: f64,
    /// Distance from the baseline to the bottom of the line.
    pub descent: f64,
    /// Line space the content needs regardless of spacing rules.
    pub inherent_line_space: f64,
}

/// Horizontal advance produced by one tab character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabOffset {
    pub leader: TabLeader,
    pub width: f64,
}

/// Where a line starts reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Cursor {
    At(LeafPos),
    /// The empty line after a trailing hard break, or of an empty paragraph.
    EmptyLine,
    Done,
}

/// One measured line. X positions are relative to the paragraph area's left
/// edge.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    /// First leaf read by the line, `None` for an empty line.
    pub start: Option<LeafPos>,
    /// Last leaf drawn by the line. Trailing blanks are not included.
    pub end: Option<LeafPos>,
    pub start_x: f64,
    pub end_x: f64,
    /// Right limit the line was broken against.
    pub right: f64,
    /// Width of the non-blank content after the last tab.
    pub word_width: f64,
    /// Stretchable blanks after the last tab.
    pub blank_count: usize,
    pub last_tab_x: f64,
    pub tab_offsets: Vec<TabOffset>,
    /// The first offset belongs to the list symbol's implicit tab.
    pub has_list_symbol: bool,
    pub hard_break: bool,
    pub hyphenated: bool,
    pub vertical: VerticalLineInfo,
    begin: Cursor,
}

/// The part of a paragraph placed in one area.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphFormatInfo {
    pub lines: Vec<LineInfo>,
    pub is_starting: bool,
    pub is_ending: bool,
    pub widow_control: bool,
    pub list_symbol: Option<String>,
    /// Space taken by the top border when the paragraph starts here.
    pub top_offset: f64,
    /// Space taken by the bottom border when the paragraph ends here.
    pub bottom_offset: f64,
    next: Cursor,
}

impl ParagraphFormatInfo {
    pub fn is_complete(&self) -> bool {
        self.is_starting && self.is_ending
    }

    fn enough_lines(&self) -> bool {
        if self.widow_control {
            self.is_complete() || self.lines.len() >= 2
        } else {
            !self.lines.is_empty()
        }
    }

    /// The start may stay on this area without leaving an orphan.
    pub fn starting_is_complete(&self) -> bool {
        self.is_starting && self.enough_lines()
    }

    /// The end is not a widow.
    pub fn ending_is_complete(&self) -> bool {
        self.is_ending && self.enough_lines()
    }

    fn guarded_lines(&self) -> usize {
        if self.widow_control {
            2
        } else {
            1
        }
    }

    pub fn starting_height(&self) -> f64 {
        let n = self.guarded_lines().min(self.lines.len());
        let lines: f64 = self.lines[..n].iter().map(|l| l.vertical.height).sum();
        lines + if self.is_starting { self.top_offset } else { 0.0 }
    }

    pub fn trailing_height(&self) -> f64 {
        let n = self.guarded_lines().min(self.lines.len());
        let from = self.lines.len() - n;
        let lines: f64 = self.lines[from..].iter().map(|l| l.vertical.height).sum();
        lines + if self.is_ending { self.bottom_offset } else { 0.0 }
    }

    pub fn content_height(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        let lines: f64 = self.lines.iter().map(|l| l.vertical.height).sum();
        lines
            + if self.is_starting { self.top_offset } else { 0.0 }
            + if self.is_ending { self.bottom_offset } else { 0.0 }
    }

    /// A copy without its last line (two lines under widow control when the
    /// paragraph ends here) together with the new content height. A start
    /// that would keep a single line under widow control moves entirely.
    pub fn with_ending_removed(&self) -> Option<(ParagraphFormatInfo, f64)> {
        if self.lines.is_empty() {
            return None;
        }
        let remove = if self.widow_control && self.is_ending && self.lines.len() >= 2 {
            2
        } else {
            1
        };
        let mut keep = self.lines.len() - remove;
        if self.is_starting && self.widow_control && keep == 1 {
            keep = 0;
        }
        let mut shorter = self.clone();
        shorter.next = self.lines[keep].begin.clone();
        shorter.lines.truncate(keep);
        shorter.is_ending = false;
        let height = shorter.content_height();
        Some((shorter, height))
    }
}

/// Spacing, indents and keep flags of a paragraph that are known before any
/// line is measured.
pub fn initial_layout(paragraph: &Paragraph) -> LayoutInfo {
    let f = &paragraph.format;
    LayoutInfo {
        margin_top: f.space_before,
        margin_bottom: f.space_after,
        keep_together: f.keep_together,
        keep_with_next: f.keep_with_next,
        page_break_before: f.page_break_before,
        ..Default::default()
    }
}

/// Format as much of `paragraph` as fits `area`, resuming after `previous`.
pub fn format_paragraph(
    ctx: &FormatContext<'_>,
    paragraph: &Paragraph,
    area: Rectangle,
    previous: Option<&ParagraphFormatInfo>,
    max_element_height: f64,
) -> (ParagraphFormatInfo, LayoutInfo) {
    let f = &paragraph.format;
    let starting = previous.map_or(true, |p| p.is_starting && p.lines.is_empty());
    let mut cursor = match previous {
        Some(p) if !starting => p.next.clone(),
        _ => first_leaf(&paragraph.content).map_or(Cursor::EmptyLine, Cursor::At),
    };

    let top_offset = borders::offset(&f.borders, BorderSide::Top);
    let bottom_offset = borders::offset(&f.borders, BorderSide::Bottom);
    let left = f.left_indent + borders::offset(&f.borders, BorderSide::Left);
    let right = area.width - f.right_indent - borders::offset(&f.borders, BorderSide::Right);
    let breaker = LineBreaker {
        ctx,
        paragraph,
        left,
        right,
        max_line_height: max_element_height,
    };
    let list_symbol = if starting {
        ctx.list_symbol(paragraph).map(str::to_string)
    } else {
        None
    };

    let mut y = area.y + if starting { top_offset } else { 0.0 };
    let mut lines = Vec::new();
    let mut is_ending = false;
    loop {
        if cursor == Cursor::Done {
            is_ending = true;
            break;
        }
        let first_line = starting && lines.is_empty();
        let symbol = if first_line {
            list_symbol.as_deref()
        } else {
            None
        };
        let (line, next) = breaker.measure_line(&cursor, first_line, symbol);
        let border = if next == Cursor::Done {
            bottom_offset
        } else {
            0.0
        };
        if area.fitting_rect(y, line.vertical.height + border).is_none() {
            break;
        }
        tracing::trace!(
            line = lines.len(),
            height = line.vertical.height,
            end_x = line.end_x,
            "measured line"
        );
        y += line.vertical.height;
        lines.push(line);
        cursor = next;
    }

    let info = ParagraphFormatInfo {
        lines,
        is_starting: starting,
        is_ending,
        widow_control: f.widow_control,
        list_symbol,
        top_offset,
        bottom_offset,
        next: cursor,
    };
    let mut layout = initial_layout(paragraph);
    layout.content_area = Rectangle::new(area.x, area.y, area.width, info.content_height());
    layout.starting_height = info.starting_height();
    layout.trailing_height = info.trailing_height();
    (info, layout)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafResult {
    Continue,
    /// Consumed without effect on the line.
    Ignore,
    NewLineBefore,
    NewLineAfter,
    BreakBeforeWord,
}

/// The running state of one line being measured.
#[derive(Debug, Clone)]
struct LineBreakState {
    x: f64,
    end_x: f64,
    word_width: f64,
    blank_count: usize,
    trailing_blanks: usize,
    last_tab_x: f64,
    tab_offsets: Vec<TabOffset>,
    vertical: VerticalLineInfo,
    has_content: bool,
    after_tab: bool,
    consumed_any: bool,
    content_end: Option<LeafPos>,
    /// Last character of the previous text fragment when nothing separates
    /// it from the next one.
    last_char: Option<char>,
    hard_break: bool,
    hyphenated: bool,
}

impl LineBreakState {
    fn new(x: f64, vertical: VerticalLineInfo) -> Self {
        Self {
            x,
            end_x: x,
            word_width: 0.0,
            blank_count: 0,
            trailing_blanks: 0,
            last_tab_x: x,
            tab_offsets: Vec::new(),
            vertical,
            has_content: false,
            after_tab: false,
            consumed_any: false,
            content_end: None,
            last_char: None,
            hard_break: false,
            hyphenated: false,
        }
    }

    fn advance_tab(&mut self, new_x: f64, leader: TabLeader) {
        self.tab_offsets.push(TabOffset {
            leader,
            width: new_x - self.x,
        });
        self.x = new_x;
        self.end_x = new_x;
        self.last_tab_x = new_x;
        self.word_width = 0.0;
        self.blank_count = 0;
        self.trailing_blanks = 0;
        self.has_content = true;
        self.after_tab = true;
        self.last_char = None;
    }
}

type WordStart = Option<(LineBreakState, LeafPos)>;

struct LineBreaker<'a, 'c> {
    ctx: &'a FormatContext<'c>,
    paragraph: &'a Paragraph,
    /// Text start of every line but the first.
    left: f64,
    right: f64,
    max_line_height: f64,
}

impl LineBreaker<'_, '_> {
    fn content(&self) -> &[Inline] {
        &self.paragraph.content
    }

    fn base_font(&self) -> &Font {
        &self.paragraph.format.font
    }

    fn measure(&self, text: &str, font: &Font) -> f64 {
        self.ctx.measurer.measure_text(text, font)
    }

    fn measure_line(
        &self,
        begin: &Cursor,
        first_line: bool,
        list_symbol: Option<&str>,
    ) -> (LineInfo, Cursor) {
        let start_x = if first_line {
            self.left + self.paragraph.format.first_line_indent
        } else {
            self.left
        };
        let mut pos = match begin {
            Cursor::At(p) => Some(p.clone()),
            Cursor::EmptyLine | Cursor::Done => None,
        };
        let first_font = match &pos {
            Some(p) => font_for(self.content(), p, self.base_font()),
            None => self.base_font(),
        };
        let vertical = calc_vertical(
            self.ctx,
            self.paragraph,
            first_font,
            None,
            VerticalLineInfo::default(),
        );
        let mut state = LineBreakState::new(start_x, vertical);

        let mut has_list_symbol = false;
        if let Some(symbol) = list_symbol {
            state.x += self.measure(symbol, self.base_font());
            let stop = if self.left > state.x + TOLERANCE {
                self.left
            } else {
                self.next_tab_stop(state.x)
                    .map_or(state.x + self.measure(" ", self.base_font()), |s| s.position)
            };
            state.advance_tab(stop, TabLeader::Spaces);
            // The first word after the symbol may still be forced onto the line.
            state.has_content = false;
            has_list_symbol = true;
        }

        let start = pos.clone();
        let mut word_start: WordStart = None;
        while let Some(p) = pos.clone() {
            let Some(leaf) = node(self.content(), &p) else {
                break;
            };
            let font = font_for(self.content(), &p, self.base_font());
            match self.format_leaf(&mut state, &mut word_start, leaf, &p, font) {
                LeafResult::Continue | LeafResult::Ignore => {
                    state.consumed_any = true;
                    pos = next_leaf(self.content(), &p);
                }
                LeafResult::NewLineBefore => break,
                LeafResult::NewLineAfter => {
                    state.consumed_any = true;
                    pos = next_leaf(self.content(), &p);
                    break;
                }
                LeafResult::BreakBeforeWord => {
                    if let Some((snapshot, word_pos)) = word_start.take() {
                        state = snapshot;
                        pos = Some(word_pos);
                    }
                    break;
                }
            }
        }
        // Every line consumes at least one leaf.
        if pos.is_some() && pos == start {
            if let Some(p) = &pos {
                pos = next_leaf(self.content(), p);
            }
        }

        let mut vertical = state.vertical;
        if self.max_line_height.is_finite() && self.max_line_height > 0.0 {
            vertical.height = vertical.height.min(self.max_line_height - TOLERANCE);
        }
        let next = match pos {
            Some(p) => Cursor::At(p),
            None if state.hard_break && *begin != Cursor::EmptyLine => Cursor::EmptyLine,
            None => Cursor::Done,
        };
        let line = LineInfo {
            start,
            end: state.content_end,
            start_x,
            end_x: state.end_x,
            right: self.right,
            word_width: state.word_width,
            blank_count: state.blank_count.saturating_sub(state.trailing_blanks),
            last_tab_x: state.last_tab_x,
            tab_offsets: state.tab_offsets,
            has_list_symbol,
            hard_break: state.hard_break,
            hyphenated: state.hyphenated,
            vertical,
            begin: begin.clone(),
        };
        (line, next)
    }

    fn format_leaf(
        &self,
        state: &mut LineBreakState,
        word_start: &mut WordStart,
        leaf: &Inline,
        pos: &LeafPos,
        font: &Font,
    ) -> LeafResult {
        match leaf {
            Inline::Text { text } => {
                let width = self.measure(text, font);
                let (first, last) = (text.chars().next(), text.chars().last());
                self.place_word_part(state, word_start, pos, font, width, first, last, None)
            }
            Inline::Symbol { symbol } => {
                let width = symbol
                    .fixed_width(font.effective_size())
                    .unwrap_or_else(|| self.measure(&symbol.as_char().to_string(), font));
                let ch = symbol.as_char();
                self.place_word_part(state, word_start, pos, font, width, Some(ch), Some(ch), None)
            }
            Inline::Field { field } => {
                let value = self.ctx.field_text(field);
                if value.is_empty() {
                    return LeafResult::Ignore;
                }
                let width = self.measure(&value, font);
                let (first, last) = (value.chars().next(), value.chars().last());
                self.place_word_part(state, word_start, pos, font, width, first, last, None)
            }
            Inline::Image(image) => {
                let extent = shape::image_extent(&self.ctx.images, image);
                *word_start = None;
                self.place_word_part(
                    state,
                    word_start,
                    pos,
                    font,
                    extent.width,
                    None,
                    None,
                    Some(extent.height),
                )
            }
            Inline::Blank => {
                if !state.has_content || state.after_tab {
                    return LeafResult::Ignore;
                }
                state.x += self.measure(" ", font);
                state.blank_count += 1;
                state.trailing_blanks += 1;
                state.last_char = None;
                *word_start = None;
                LeafResult::Continue
            }
            Inline::Tab => self.format_tab(state, word_start, pos),
            Inline::LineBreak => {
                state.vertical =
                    calc_vertical(self.ctx, self.paragraph, font, None, state.vertical);
                state.hard_break = true;
                LeafResult::NewLineAfter
            }
            Inline::SoftHyphen => self.format_soft_hyphen(state, word_start, pos, font),
            Inline::FormattedText(_) | Inline::Hyperlink(_) => LeafResult::Ignore,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn place_word_part(
        &self,
        state: &mut LineBreakState,
        word_start: &mut WordStart,
        pos: &LeafPos,
        font: &Font,
        width: f64,
        first: Option<char>,
        last: Option<char>,
        image_height: Option<f64>,
    ) -> LeafResult {
        let starts_word = word_start.is_none()
            || matches!(
                (state.last_char, first),
                (Some(a), Some(b)) if break_allowed_between(a, b)
            );
        if starts_word {
            *word_start = Some((state.clone(), pos.clone()));
        }
        if state.x + width > self.right + TOLERANCE && state.has_content {
            return match word_start {
                Some((snapshot, _)) if snapshot.has_content => LeafResult::BreakBeforeWord,
                _ => LeafResult::NewLineBefore,
            };
        }
        state.x += width;
        state.end_x = state.x;
        state.word_width += width;
        state.has_content = true;
        state.after_tab = false;
        state.trailing_blanks = 0;
        state.content_end = Some(pos.clone());
        state.last_char = last;
        state.vertical =
            calc_vertical(self.ctx, self.paragraph, font, image_height, state.vertical);
        LeafResult::Continue
    }

    fn format_soft_hyphen(
        &self,
        state: &mut LineBreakState,
        word_start: &mut WordStart,
        pos: &LeafPos,
        font: &Font,
    ) -> LeafResult {
        if !state.has_content {
            return LeafResult::Ignore;
        }
        let next_part = self.probe_syllable_width(pos);
        if state.x + next_part <= self.right + TOLERANCE {
            state.last_char = None;
            return LeafResult::Ignore;
        }
        let hyphen = self.measure("-", font);
        let word_has_line = matches!(word_start, Some((snapshot, _)) if snapshot.has_content);
        if state.x + hyphen > self.right + TOLERANCE && word_has_line {
            return LeafResult::BreakBeforeWord;
        }
        state.x += hyphen;
        state.end_x = state.x;
        state.word_width += hyphen;
        state.content_end = Some(pos.clone());
        state.hyphenated = true;
        LeafResult::NewLineAfter
    }

    fn format_tab(
        &self,
        state: &mut LineBreakState,
        word_start: &mut WordStart,
        pos: &LeafPos,
    ) -> LeafResult {
        let Some(stop) = self.next_tab_stop(state.x) else {
            return if state.consumed_any {
                LeafResult::NewLineBefore
            } else {
                LeafResult::Ignore
            };
        };
        let new_x = match stop.alignment {
            TabAlignment::Left => stop.position,
            TabAlignment::Right => stop.position - self.probe_run_width(pos, None).unwrap_or(0.0),
            TabAlignment::Center => {
                stop.position - self.probe_run_width(pos, None).unwrap_or(0.0) / 2.0
            }
            TabAlignment::Decimal => {
                let separator = self.ctx.options.decimal_separator;
                let width = self
                    .probe_run_width(pos, Some(separator))
                    .or_else(|| self.probe_run_width(pos, None))
                    .unwrap_or(0.0);
                stop.position - width
            }
        };
        state.advance_tab(new_x.max(state.x), stop.leader);
        state.content_end = Some(pos.clone());
        *word_start = None;
        LeafResult::Continue
    }

    /// The next tab stop right of `x`: explicit stops first, then an
    /// implicit stop at the left indent, then the default interval.
    fn next_tab_stop(&self, x: f64) -> Option<TabStop> {
        let mut stops = self.paragraph.format.tab_stops.clone();
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        if let Some(stop) = stops.iter().find(|s| s.position > x + TOLERANCE) {
            if stop.position <= self.right + TOLERANCE {
                return Some(*stop);
            }
        }
        if x + TOLERANCE < self.left {
            return Some(TabStop::new(self.left, TabAlignment::Left));
        }
        let interval = self.ctx.options.default_tab_stop;
        if interval <= 0.0 {
            return None;
        }
        let position = (((x + TOLERANCE) / interval).floor() + 1.0) * interval;
        (position <= self.right + TOLERANCE).then(|| TabStop::new(position, TabAlignment::Left))
    }

    /// Width of the run after the tab at `tab` up to the next tab or line
    /// break. With a `separator`, the width up to the first occurrence of it,
    /// or `None` when the run has none.
    fn probe_run_width(&self, tab: &LeafPos, separator: Option<char>) -> Option<f64> {
        let mut width = 0.0;
        let mut pending_blanks = 0.0;
        // Blanks directly after the tab are not laid out.
        let mut seen_content = false;
        let mut pos = next_leaf(self.content(), tab);
        while let Some(p) = pos {
            let Some(leaf) = node(self.content(), &p) else {
                break;
            };
            let font = font_for(self.content(), &p, self.base_font());
            let text = match leaf {
                Inline::Tab | Inline::LineBreak => break,
                Inline::Blank => {
                    if seen_content {
                        pending_blanks += self.measure(" ", font);
                    }
                    pos = next_leaf(self.content(), &p);
                    continue;
                }
                Inline::Text { text } => Some(text.clone()),
                Inline::Field { field } => Some(self.ctx.field_text(field)),
                Inline::Symbol { symbol } => Some(symbol.as_char().to_string()),
                Inline::Image(image) => {
                    width += pending_blanks + shape::image_extent(&self.ctx.images, image).width;
                    pending_blanks = 0.0;
                    seen_content = true;
                    None
                }
                _ => None,
            };
            if let Some(text) = text {
                if let Some(sep) = separator {
                    if let Some(idx) = text.find(sep) {
                        return Some(width + pending_blanks + self.measure(&text[..idx], font));
                    }
                }
                width += pending_blanks + self.measure(&text, font);
                pending_blanks = 0.0;
                seen_content = true;
            }
            pos = next_leaf(self.content(), &p);
        }
        match separator {
            Some(_) => None,
            None => Some(width),
        }
    }

    /// Width of the word fragment following a soft hyphen.
    fn probe_syllable_width(&self, hyphen: &LeafPos) -> f64 {
        let mut width = 0.0;
        let mut pos = next_leaf(self.content(), hyphen);
        while let Some(p) = pos {
            match node(self.content(), &p) {
                Some(Inline::Text { text }) => {
                    width += self.measure(text, font_for(self.content(), &p, self.base_font()));
                }
                _ => break,
            }
            pos = next_leaf(self.content(), &p);
        }
        width
    }
}

fn break_allowed_between(before: char, after: char) -> bool {
    let mut probe = String::new();
    probe.push(before);
    let split = probe.len();
    probe.push(after);
    let allowed = linebreaks(&probe).any(|(idx, op)| idx == split && op == BreakOpportunity::Allowed);
    allowed
}

/// Merge the metrics of `font` (and an inline image) into `current`.
fn calc_vertical(
    ctx: &FormatContext<'_>,
    paragraph: &Paragraph,
    font: &Font,
    image_height: Option<f64>,
    current: VerticalLineInfo,
) -> VerticalLineInfo {
    let f = &paragraph.format;
    let metrics = ctx.measurer.metrics(font);
    let descent = metrics.descent.max(current.descent);
    let mut single = metrics.line_spacing;
    if let Some(h) = image_height {
        single = single - metrics.ascent + h;
    }
    let mut inherent = current.inherent_line_space.max(single);
    let height = match f.line_spacing_rule {
        LineSpacingRule::Single => single,
        LineSpacingRule::OnePtFive => 1.5 * single,
        LineSpacingRule::Double => 2.0 * single,
        LineSpacingRule::Multiple => f.line_spacing * single,
        LineSpacingRule::AtLeast => single.max(f.line_spacing),
        LineSpacingRule::Exactly => {
            inherent = f.line_spacing;
            f.line_spacing
        }
    };
    VerticalLineInfo {
        height: current.height.max(height).max(0.0),
        descent,
        inherent_line_space: inherent,
    }
}

/// Names of the bookmarks read by this part of the paragraph.
pub fn bookmarks<'p>(paragraph: &'p Paragraph, info: &ParagraphFormatInfo) -> Vec<&'p str> {
    let Some(Cursor::At(start)) = info.lines.first().map(|l| &l.begin) else {
        return Vec::new();
    };
    let stop = match &info.next {
        Cursor::At(pos) => Some(pos),
        _ => None,
    };
    let mut names = Vec::new();
    let mut pos = Some(start.clone());
    while let Some(p) = pos {
        if Some(&p) == stop {
            break;
        }
        if let Some(Inline::Field {
            field: Field::Bookmark { name },
        }) = node(&paragraph.content, &p)
        {
            names.push(name.as_str());
        }
        pos = next_leaf(&paragraph.content, &p);
    }
    names
}

/// Draw the part of `paragraph` described by `info` into its content area.
pub fn render_paragraph(
    rc: &mut RenderContext<'_, '_>,
    paragraph: &Paragraph,
    info: &ParagraphFormatInfo,
    layout: &LayoutInfo,
) {
    if info.lines.is_empty() {
        return;
    }
    let f = &paragraph.format;
    let area = layout.content_area;
    let frame = Rectangle::new(
        area.x + f.left_indent,
        area.y,
        (area.width - f.left_indent - f.right_indent).max(0.0),
        area.height,
    );
    borders::render_shading(rc.graphics, f.shading.as_ref(), frame);
    borders::render_box(rc.graphics, &f.borders, frame, info.is_starting, info.is_ending);

    let mut top = area.y + if info.is_starting { info.top_offset } else { 0.0 };
    let last = info.lines.len() - 1;
    for (i, line) in info.lines.iter().enumerate() {
        let last_line = info.is_ending && i == last;
        render_line(rc, paragraph, info, line, area.x, top, last_line);
        top += line.vertical.height;
    }
}

fn render_line(
    rc: &mut RenderContext<'_, '_>,
    paragraph: &Paragraph,
    info: &ParagraphFormatInfo,
    line: &LineInfo,
    area_x: f64,
    top: f64,
    last_line: bool,
) {
    let f = &paragraph.format;
    let content = &paragraph.content;
    let baseline = top + line.vertical.height - line.vertical.descent;
    let slack = (line.right - line.end_x).max(0.0);
    let mut x = area_x
        + line.start_x
        + match f.alignment {
            Alignment::Right => slack,
            Alignment::Center => slack / 2.0,
            Alignment::Left | Alignment::Justify => 0.0,
        };
    let justified_blank = (f.alignment == Alignment::Justify
        && !last_line
        && !line.hard_break
        && line.blank_count > 0)
        .then(|| (line.right - line.last_tab_x - line.word_width) / line.blank_count as f64);

    let mut tabs = line.tab_offsets.iter();
    let mut tabs_left = line.tab_offsets.len();
    let mut has_content = false;
    let mut after_tab = false;
    if line.has_list_symbol {
        if let Some(symbol) = &info.list_symbol {
            rc.graphics.draw_text(symbol, &f.font, x, baseline);
            x += rc.measurer.measure_text(symbol, &f.font);
        }
        if let Some(tab) = tabs.next() {
            x += tab.width;
            tabs_left -= 1;
        }
        after_tab = true;
    }

    let (Some(start), Some(end)) = (&line.start, &line.end) else {
        return;
    };
    let mut pos = Some(start.clone());
    while let Some(p) = pos {
        let Some(leaf) = node(content, &p) else {
            break;
        };
        let font = font_for(content, &p, &f.font);
        let link = hyperlink_for(content, &p);
        let x_before = x;
        match leaf {
            Inline::Text { text } => {
                x += draw_run(rc, text, font, x, baseline);
                has_content = true;
                after_tab = false;
            }
            Inline::Symbol { symbol } => {
                let text = symbol.as_char().to_string();
                let width = symbol
                    .fixed_width(font.effective_size())
                    .unwrap_or_else(|| rc.measurer.measure_text(&text, font));
                if symbol.fixed_width(font.effective_size()).is_none() {
                    draw_run(rc, &text, font, x, baseline);
                }
                x += width;
                has_content = true;
                after_tab = false;
            }
            Inline::Field { field } => {
                let value = rc.fields.display(field);
                if !value.is_empty() {
                    x += draw_run(rc, &value, font, x, baseline);
                    has_content = true;
                    after_tab = false;
                }
            }
            Inline::Image(image) => {
                let extent = shape::image_extent(rc.images, image);
                let rect = Rectangle::new(x, baseline - extent.height, extent.width, extent.height);
                shape::draw_image(rc.graphics, image, &extent, rect);
                x += extent.width;
                has_content = true;
                after_tab = false;
            }
            Inline::Blank => {
                if has_content && !after_tab {
                    x += match justified_blank {
                        Some(w) if tabs_left == 0 => w,
                        _ => rc.measurer.measure_text(" ", font),
                    };
                }
            }
            Inline::Tab => {
                if let Some(tab) = tabs.next() {
                    draw_leader(rc, tab, font, x, baseline);
                    x += tab.width;
                    tabs_left -= 1;
                    has_content = true;
                    after_tab = true;
                }
            }
            Inline::SoftHyphen => {
                if line.hyphenated && p == *end {
                    x += draw_run(rc, "-", font, x, baseline);
                }
            }
            Inline::LineBreak | Inline::FormattedText(_) | Inline::Hyperlink(_) => {}
        }
        if let Some(target) = link {
            if x > x_before {
                let rect = Rectangle::new(x_before, top, x - x_before, line.vertical.height);
                rc.graphics.add_link(rect, target);
            }
        }
        if p == *end {
            break;
        }
        pos = next_leaf(content, &p);
    }
}

/// Draw `text` with its decorations and return its advance.
fn draw_run(rc: &mut RenderContext<'_, '_>, text: &str, font: &Font, x: f64, baseline: f64) -> f64 {
    let width = rc.measurer.measure_text(text, font);
    let y = baseline + font.baseline_shift();
    rc.graphics.draw_text(text, font, x, y);
    if font.underline != Underline::None {
        let size = font.effective_size();
        let mut pen = Pen::new(size * 0.05, font.color);
        if font.underline == Underline::Dotted {
            pen.dash = crate::graphics::Dash::Dot;
        }
        let offset = size * 0.12;
        rc.graphics.draw_line(&pen, x, y + offset, x + width, y + offset);
        if font.underline == Underline::Double {
            let second = offset + size * 0.1;
            rc.graphics.draw_line(&pen, x, y + second, x + width, y + second);
        }
    }
    width
}

fn draw_leader(
    rc: &mut RenderContext<'_, '_>,
    tab: &TabOffset,
    font: &Font,
    x: f64,
    baseline: f64,
) {
    let glyph = match tab.leader {
        TabLeader::Spaces => return,
        TabLeader::Dots => ".",
        TabLeader::MiddleDot => "\u{b7}",
        TabLeader::Dashes => "-",
        TabLeader::Lines | TabLeader::Heavy => {
            let width = if tab.leader == TabLeader::Heavy { 1.5 } else { 0.5 };
            let pen = Pen::new(width, font.color);
            rc.graphics.draw_line(&pen, x, baseline, x + tab.width, baseline);
            return;
        }
    };
    let glyph_width = rc.measurer.measure_text(glyph, font);
    if glyph_width <= 0.0 {
        return;
    }
    let count = (tab.width / glyph_width).floor() as usize;
    if count > 1 {
        // Leave one glyph of air before the text the tab aligns.
        let leader = glyph.repeat(count - 1);
        rc.graphics.draw_text(&leader, font, x, baseline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::DisplayList;
    use crate::layout::testing::{render_context, FixedMeasurer};
    use crate::layout::LayoutOptions;
    use crate::model::{Block, Field, ListInfo, ListType, NumberFormat, ParagraphFormat};

    fn paragraph(text: &str, size: f64) -> Paragraph {
        let mut format = ParagraphFormat::default();
        format.font = Font::new("Helvetica", size);
        let mut p = Paragraph::new(format);
        p.add_text(text);
        p
    }

    fn format_in(
        p: &Paragraph,
        area: Rectangle,
        previous: Option<&ParagraphFormatInfo>,
    ) -> (ParagraphFormatInfo, LayoutInfo) {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        format_paragraph(&ctx, p, area, previous, f64::INFINITY)
    }

    fn render(p: &Paragraph, info: &ParagraphFormatInfo, layout: &LayoutInfo) -> DisplayList {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let mut list = DisplayList::new();
        {
            let (fields, images) = render_context();
            let mut rc = RenderContext {
                measurer: &measurer,
                options: &options,
                fields: &fields,
                images: &images,
                graphics: &mut list,
            };
            render_paragraph(&mut rc, p, info, layout);
        }
        list
    }

    #[test]
    fn overflow_splits_after_two_lines() {
        // 6 pt per character at 12 pt; each word fills a 60 pt line.
        let p = paragraph("aaaaaaaaa bbbbbbbbb ccccccccc", 12.0);
        let area = Rectangle::new(0.0, 0.0, 60.0, 30.0);
        let (first, layout) = format_in(&p, area, None);
        assert_eq!(first.lines.len(), 2);
        assert!(first.is_starting && !first.is_ending);
        assert_eq!(layout.content_area.height, 24.0);

        let (second, _) = format_in(&p, area, Some(&first));
        assert_eq!(second.lines.len(), 1);
        assert!(!second.is_starting && second.is_ending);
        assert!(!second.ending_is_complete());
    }

    #[test]
    fn nothing_fits_a_short_area() {
        let p = paragraph("word", 12.0);
        let (info, layout) = format_in(&p, Rectangle::new(0.0, 0.0, 100.0, 5.0), None);
        assert!(info.lines.is_empty());
        assert_eq!(layout.content_area.height, 0.0);
        assert!(!info.is_ending);
    }

    #[test]
    fn overlong_word_is_forced_onto_its_own_line() {
        let p = paragraph("abcdefghijklmnopqrstuvwxyz ab", 10.0);
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 40.0), None);
        assert_eq!(info.lines.len(), 2);
        assert!(info.is_ending);
        assert!(info.lines[0].end_x > 40.0);
    }

    #[test]
    fn line_breaking_always_progresses() {
        let p = paragraph("x y z w v u t s r q p o n m", 10.0);
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 1.0), None);
        assert_eq!(info.lines.len(), 14);
        assert!(info.is_ending);
    }

    #[test]
    fn empty_paragraph_has_one_line() {
        let p = Paragraph::new(ParagraphFormat::default());
        let (info, layout) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        assert_eq!(info.lines.len(), 1);
        assert!(info.is_complete());
        assert_eq!(layout.content_area.height, 10.0);
    }

    #[test]
    fn trailing_hard_break_adds_an_empty_line() {
        let mut p = paragraph("ab", 10.0);
        p.add_line_break();
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        assert_eq!(info.lines.len(), 2);
        assert!(info.lines[0].hard_break);
        assert!(info.lines[1].end.is_none());
    }

    #[test]
    fn trailing_blanks_do_not_count() {
        let p = paragraph("aa bb ", 10.0);
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        let line = &info.lines[0];
        assert_eq!(line.blank_count, 1);
        assert_eq!(line.end_x, 25.0);
        assert_eq!(line.word_width, 20.0);
    }

    #[test]
    fn exact_spacing_fixes_line_height() {
        let mut p = paragraph("abc", 20.0);
        p.format.line_spacing_rule = LineSpacingRule::Exactly;
        p.format.line_spacing = 14.0;
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        let v = info.lines[0].vertical;
        assert_eq!(v.height, 14.0);
        assert_eq!(v.inherent_line_space, 14.0);
    }

    #[test]
    fn justified_line_fills_the_width() {
        let mut p = paragraph("aa bb cc dd ee ff", 10.0);
        p.format.alignment = Alignment::Justify;
        let area = Rectangle::new(0.0, 0.0, 50.0, 100.0);
        let (info, layout) = format_in(&p, area, None);
        assert!(info.lines.len() >= 2);
        let list = render(&p, &info, &layout);
        let first_line_y = list.texts()[0].2;
        let last_on_line = list
            .texts()
            .into_iter()
            .filter(|(_, _, y)| *y == first_line_y)
            .last()
            .unwrap();
        // Last glyph of a justified line ends at the right limit.
        assert!((last_on_line.1 + 10.0 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn decimal_tab_aligns_separator() {
        let mut p = Paragraph::new(ParagraphFormat::default());
        p.format.tab_stops = vec![TabStop::new(50.0, TabAlignment::Decimal)];
        p.add_tab();
        p.add_text("12.50");
        let (info, layout) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        let list = render(&p, &info, &layout);
        let (text, x, _) = list.texts()[0];
        assert_eq!(text, "12.50");
        assert_eq!(x + 10.0, 50.0);
    }

    #[test]
    fn blank_after_decimal_tab_does_not_shift_the_run() {
        let mut p = Paragraph::new(ParagraphFormat::default());
        p.format.tab_stops = vec![TabStop::new(50.0, TabAlignment::Decimal)];
        p.add_tab();
        p.add_inline(Inline::Blank);
        p.add_inline(Inline::text("12.50"));
        let (info, layout) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        let list = render(&p, &info, &layout);
        let (text, x, _) = list.texts()[0];
        assert_eq!(text, "12.50");
        assert_eq!(x + 10.0, 50.0);
    }

    #[test]
    fn decimal_tab_without_separator_aligns_right() {
        let mut p = Paragraph::new(ParagraphFormat::default());
        p.format.tab_stops = vec![TabStop::new(50.0, TabAlignment::Decimal)];
        p.add_tab();
        p.add_text("1250");
        let (info, layout) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        let list = render(&p, &info, &layout);
        let (_, x, _) = list.texts()[0];
        assert_eq!(x + 20.0, 50.0);
    }

    #[test]
    fn soft_hyphen_breaks_with_a_hyphen() {
        let mut p = Paragraph::new(ParagraphFormat::default());
        p.add_inline(Inline::text("abcd"));
        p.add_inline(Inline::SoftHyphen);
        p.add_inline(Inline::text("efgh"));
        let (info, layout) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 30.0), None);
        assert_eq!(info.lines.len(), 2);
        assert!(info.lines[0].hyphenated);
        let list = render(&p, &info, &layout);
        let texts: Vec<&str> = list.texts().iter().map(|t| t.0).collect();
        assert_eq!(texts, vec!["abcd", "-", "efgh"]);
    }

    #[test]
    fn widow_control_moves_two_lines() {
        let p = paragraph("a b c", 10.0);
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 10.0), None);
        assert_eq!(info.lines.len(), 3);
        let (shorter, height) = info.with_ending_removed().unwrap();
        assert_eq!(shorter.lines.len(), 0);
        assert_eq!(height, 0.0);

        let p = paragraph("a b c d e", 10.0);
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 10.0), None);
        let (shorter, height) = info.with_ending_removed().unwrap();
        assert_eq!(shorter.lines.len(), 3);
        assert_eq!(height, 30.0);
        let (rest, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 10.0), Some(&shorter));
        assert_eq!(rest.lines.len(), 2);
        assert!(rest.is_ending);
    }

    #[test]
    fn list_paragraphs_number_consecutively() {
        let mut blocks = Vec::new();
        for text in ["one", "two"] {
            let mut p = paragraph(text, 10.0);
            p.format.list_info = Some(ListInfo {
                list_type: ListType::NumberList1,
                continue_previous_list: true,
            });
            p.format.left_indent = 30.0;
            p.format.first_line_indent = -30.0;
            blocks.push(Block::Paragraph(p));
        }
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let mut ctx = FormatContext::new(&measurer, &options);
        ctx.register_lists(&blocks);
        let Block::Paragraph(second) = &blocks[1] else {
            unreachable!()
        };
        let area = Rectangle::unbounded(0.0, 0.0, 100.0);
        let (info, _) = format_paragraph(&ctx, second, area, None, f64::INFINITY);
        assert_eq!(info.list_symbol.as_deref(), Some("2."));
        assert!(info.lines[0].has_list_symbol);
        assert_eq!(info.lines[0].tab_offsets[0].width, 20.0);
    }

    #[test]
    fn page_field_uses_format_time_value() {
        let mut p = Paragraph::new(ParagraphFormat::default());
        p.add_field(Field::PageNumber {
            format: NumberFormat::UpperRoman,
        });
        let (info, _) = format_in(&p, Rectangle::unbounded(0.0, 0.0, 100.0), None);
        assert_eq!(info.lines[0].end_x, 5.0);
    }
}
