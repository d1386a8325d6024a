// src/context/assembler.rs
// C9: Context Assembler - packs a FileContext (plus conversation history
// and memories) into a token-budgeted prompt, split into a system section
// (memory + project) and a user section (everything else) (§4.8).

use crate::context::gatherer::FileContext;

/// Coarse category used for budgeting and rendering (§4.8 budget table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Selection,
    Cursor,
    File,
    Symbol,
    History,
    Memory,
    Project,
}

impl ItemCategory {
    fn label(self) -> &'static str {
        match self {
            ItemCategory::Selection => "SELECTION",
            ItemCategory::Cursor => "CURSOR",
            ItemCategory::File => "FILE",
            ItemCategory::Symbol => "SYMBOL",
            ItemCategory::History => "HISTORY",
            ItemCategory::Memory => "MEMORY",
            ItemCategory::Project => "PROJECT",
        }
    }

    fn is_system(self) -> bool {
        matches!(self, ItemCategory::Memory | ItemCategory::Project)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Coding,
    Debug,
    Explain,
    Chat,
}

/// One packable unit of evidence: a source label, its rendered content,
/// a priority in `[0,100]` (higher packs first), and the category it
/// belongs to.
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub category: ItemCategory,
    pub source: String,
    pub content: String,
    pub priority: u8,
}

impl ContextItem {
    pub fn new(category: ItemCategory, source: impl Into<String>, content: impl Into<String>, priority: u8) -> Self {
        Self { category, source: source.into(), content: content.into(), priority }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub system_context: String,
    pub user_context: String,
    pub included: Vec<String>,
    pub truncated: Vec<String>,
    pub excluded: Vec<String>,
    pub estimated_tokens: usize,
}

/// Total token ceiling shared by every intent (§4.8 budget table, "total"
/// row): each intent's per-category budgets below sum to this.
pub const DEFAULT_MAX_TOKENS: usize = 8000;

/// Per-intent, per-category token budgets (§4.8). Every intent carries a
/// memory and project allotment regardless of what else it drops; each
/// row sums to `DEFAULT_MAX_TOKENS`.
fn category_budget(intent: Intent, category: ItemCategory) -> usize {
    match (intent, category) {
        (Intent::Coding, ItemCategory::Selection) => 2000,
        (Intent::Coding, ItemCategory::Cursor) => 1500,
        (Intent::Coding, ItemCategory::File) => 2000,
        (Intent::Coding, ItemCategory::Symbol) => 1500,
        (Intent::Coding, ItemCategory::History) => 500,
        (Intent::Coding, ItemCategory::Memory) => 300,
        (Intent::Coding, ItemCategory::Project) => 200,

        (Intent::Debug, ItemCategory::Selection) => 1500,
        (Intent::Debug, ItemCategory::Cursor) => 2000,
        (Intent::Debug, ItemCategory::File) => 2500,
        (Intent::Debug, ItemCategory::Symbol) => 1500,
        (Intent::Debug, ItemCategory::History) => 300,
        (Intent::Debug, ItemCategory::Memory) => 100,
        (Intent::Debug, ItemCategory::Project) => 100,

        (Intent::Explain, ItemCategory::Selection) => 2500,
        (Intent::Explain, ItemCategory::Cursor) => 1000,
        (Intent::Explain, ItemCategory::File) => 1500,
        (Intent::Explain, ItemCategory::Symbol) => 2000,
        (Intent::Explain, ItemCategory::History) => 500,
        (Intent::Explain, ItemCategory::Memory) => 300,
        (Intent::Explain, ItemCategory::Project) => 200,

        (Intent::Chat, ItemCategory::Selection) => 1000,
        (Intent::Chat, ItemCategory::Cursor) => 500,
        (Intent::Chat, ItemCategory::File) => 1000,
        (Intent::Chat, ItemCategory::Symbol) => 1000,
        (Intent::Chat, ItemCategory::History) => 2000,
        (Intent::Chat, ItemCategory::Memory) => 1500,
        (Intent::Chat, ItemCategory::Project) => 1000,
    }
}

/// Priority within a category, `[0,100]`, higher packs first (§3
/// `ContextItem`, §4.8 "priority order" / "considered in
/// priority-descending order").
fn default_priority(category: ItemCategory) -> u8 {
    match category {
        ItemCategory::Selection => 100,
        ItemCategory::Cursor => 90,
        ItemCategory::Symbol => 85,
        ItemCategory::History => 70,
        ItemCategory::File => 60,
        ItemCategory::Memory => 40,
        ItemCategory::Project => 30,
    }
}

/// Rough general-purpose char-to-token heuristic: counts characters but
/// discounts dense code punctuation, since code tokenizes more densely
/// than prose (§4.8 "token estimate"). Deliberately distinct from
/// `truncation_char_budget` below - the two evolved for different jobs
/// and are not meant to be unified.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let code_indicators = ["fn ", "def ", "class ", "{", "}", "=>", "->", "const ", "let ", "import "];
    let is_code_like = code_indicators.iter().any(|i| text.contains(i));
    let divisor = if is_code_like { 3.2 } else { 4.0 };
    ((text.len() as f64) / divisor).ceil() as usize
}

/// Char budget for a token ceiling, used only when truncating an
/// over-long item to fit. Uses a looser symbol set than
/// `estimate_tokens` because truncation cares about not cutting a
/// dangling bracket or statement mid-line, not about overall density.
fn truncation_char_budget(max_tokens: usize, text: &str) -> usize {
    let loose_indicators = ['{', '}', ';', '(', ')', '['];
    let density = text.chars().filter(|c| loose_indicators.contains(c)).count();
    let ratio = if density * 10 > text.len() { 3.0 } else { 4.0 };
    ((max_tokens as f64) * ratio) as usize
}

const MIN_MEANINGFUL_TOKENS: usize = 100;
const MIN_RETAINED_FRACTION: f64 = 0.8;

pub struct ContextAssembler;

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Builds the full item list for one request from a `FileContext` plus
    /// optional history/memory strings (§4.7 output feeding §4.8 input).
    pub fn items_from_file_context(&self, ctx: &FileContext, selection: Option<&str>) -> Vec<ContextItem> {
        let mut items = Vec::new();

        if let Some(sel) = selection.filter(|s| !s.trim().is_empty()) {
            items.push(ContextItem::new(ItemCategory::Selection, ctx.file_path.clone(), sel, default_priority(ItemCategory::Selection)));
        }

        if !ctx.surrounding_window.trim().is_empty() {
            items.push(ContextItem::new(
                ItemCategory::Cursor,
                ctx.file_path.clone(),
                ctx.surrounding_window.clone(),
                default_priority(ItemCategory::Cursor),
            ));
        }

        if let Some(sym) = &ctx.symbol_at_cursor {
            items.push(ContextItem::new(
                ItemCategory::Symbol,
                format!("{}:{}", ctx.file_path, sym.name),
                format!("{} {}{}", sym.kind.as_str(), sym.name, sym.signature.clone().unwrap_or_default()),
                default_priority(ItemCategory::Symbol),
            ));
        }
        for sym in ctx.related_symbols.iter().take(10) {
            items.push(ContextItem::new(
                ItemCategory::Symbol,
                format!("{}:{}", sym.file_path, sym.name),
                format!("{} {}{}", sym.kind.as_str(), sym.name, sym.signature.clone().unwrap_or_default()),
                default_priority(ItemCategory::Symbol).saturating_sub(5),
            ));
        }

        for snippet in &ctx.relevant_snippets {
            items.push(ContextItem::new(
                ItemCategory::Symbol,
                snippet.title.clone(),
                snippet.content.clone(),
                default_priority(ItemCategory::Symbol),
            ));
        }

        for referenced in &ctx.referenced_files {
            items.push(ContextItem::new(
                ItemCategory::File,
                referenced.path.clone(),
                referenced.content.clone(),
                default_priority(ItemCategory::File),
            ));
        }

        if !ctx.project_tree.trim().is_empty() {
            items.push(ContextItem::new(
                ItemCategory::Project,
                "project_tree".to_string(),
                ctx.project_tree.clone(),
                default_priority(ItemCategory::Project),
            ));
        }

        items
    }

    /// Packs `items` into an `AssembledContext` according to `intent`'s
    /// per-category budgets, additionally honoring a hard `max_tokens`
    /// ceiling across every category combined (§4.8 "a max token budget ...
    /// and per-category sub-budgets"). Items are grouped by category,
    /// ordered by priority descending within the group, and packed
    /// greedily until that category's budget (or, if tighter, the
    /// remaining global budget) is exhausted; an item that would blow the
    /// effective budget is truncated to at least 80% of the remaining
    /// allowance if that retains >= 100 tokens of meaning, else dropped
    /// entirely (§4.8 invariants 5 and 6). Every input item ends up in
    /// exactly one of `included`, `truncated`, or `excluded`.
    pub fn assemble(&self, intent: Intent, items: Vec<ContextItem>, max_tokens: usize) -> AssembledContext {
        let mut by_category: std::collections::HashMap<ItemCategory, Vec<ContextItem>> = std::collections::HashMap::new();
        for item in items {
            by_category.entry(item.category).or_default().push(item);
        }

        let mut system_parts = Vec::new();
        let mut user_parts = Vec::new();
        let mut included = Vec::new();
        let mut truncated = Vec::new();
        let mut excluded = Vec::new();
        let mut total_tokens = 0usize;

        let categories = [
            ItemCategory::Selection,
            ItemCategory::Cursor,
            ItemCategory::Symbol,
            ItemCategory::History,
            ItemCategory::File,
            ItemCategory::Memory,
            ItemCategory::Project,
        ];

        for category in categories {
            let Some(mut group) = by_category.remove(&category) else { continue };
            group.sort_by(|a, b| b.priority.cmp(&a.priority));

            let mut remaining = category_budget(intent, category);

            for item in group {
                let global_remaining = max_tokens.saturating_sub(total_tokens);
                if remaining == 0 || global_remaining == 0 {
                    excluded.push(item.source.clone());
                    continue;
                }
                let cap = remaining.min(global_remaining);

                let tokens = estimate_tokens(&item.content);
                let mut item_was_truncated = false;
                let rendered = if tokens <= cap {
                    item.content.clone()
                } else {
                    let retained_fraction = cap as f64 / tokens.max(1) as f64;
                    if retained_fraction < MIN_RETAINED_FRACTION && cap < MIN_MEANINGFUL_TOKENS {
                        excluded.push(item.source.clone());
                        continue;
                    }
                    let char_budget = truncation_char_budget(cap, &item.content);
                    let shortened = truncate_at_line_boundary(&item.content, char_budget);
                    if estimate_tokens(&shortened) < MIN_MEANINGFUL_TOKENS && cap < MIN_MEANINGFUL_TOKENS {
                        excluded.push(item.source.clone());
                        continue;
                    }
                    item_was_truncated = true;
                    shortened
                };

                let block = format!("[{}] {}:\n{}", category.label(), item.source, rendered);
                let block_tokens = estimate_tokens(&block);
                remaining = remaining.saturating_sub(block_tokens);
                total_tokens += block_tokens;

                if item_was_truncated {
                    truncated.push(item.source.clone());
                } else {
                    included.push(item.source.clone());
                }
                if category.is_system() {
                    system_parts.push(block);
                } else {
                    user_parts.push(block);
                }
            }
        }

        AssembledContext {
            system_context: system_parts.join("\n\n"),
            user_context: user_parts.join("\n\n"),
            included,
            truncated,
            excluded,
            estimated_tokens: total_tokens,
        }
    }
}

/// Truncates `text` to at most `char_budget` characters, backing up to
/// the nearest preceding newline so a statement is never cut mid-line.
fn truncate_at_line_boundary(text: &str, char_budget: usize) -> String {
    if text.len() <= char_budget {
        return text.to_string();
    }
    let slice_end = char_boundary_at_or_before(text, char_budget);
    let slice = &text[..slice_end];
    match slice.rfind('\n') {
        Some(idx) if idx > 0 => format!("{}\n[... truncated ...]", &slice[..idx]),
        _ => format!("{slice}\n[... truncated ...]"),
    }
}

fn char_boundary_at_or_before(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_treats_code_more_densely_than_prose() {
        let code = "fn main() { let x = 1; }".repeat(10);
        let prose = "the quick brown fox jumps over the lazy dog ".repeat(10);
        assert!(estimate_tokens(&code) > 0);
        assert!(estimate_tokens(&prose) > 0);
        // Same length, code should yield more estimated tokens (denser divisor).
        let code_eq_len = &code[..code.len().min(prose.len())];
        assert!(estimate_tokens(code_eq_len) >= estimate_tokens(&prose[..code_eq_len.len()]));
    }

    #[test]
    fn truncate_at_line_boundary_never_splits_mid_line() {
        let text = "line one\nline two\nline three\nline four\n";
        let truncated = truncate_at_line_boundary(text, 15);
        assert!(!truncated.contains("line tw\n") || truncated.ends_with("[... truncated ...]"));
        assert!(truncated.ends_with("[... truncated ...]"));
    }

    #[test]
    fn s4_assemble_respects_category_budgets_and_drops_low_priority() {
        let assembler = ContextAssembler::new();
        let huge = "x".repeat(20_000);
        let items = vec![
            ContextItem::new(ItemCategory::Selection, "sel", "small selection", 100),
            ContextItem::new(ItemCategory::File, "huge.py", huge, 60),
            ContextItem::new(ItemCategory::Project, "project_tree", "root/\n  a.py\n", 30),
        ];
        let assembled = assembler.assemble(Intent::Coding, items, DEFAULT_MAX_TOKENS);

        assert!(assembled.user_context.contains("small selection"));
        assert!(assembled.system_context.contains("project_tree") || assembled.included.contains(&"project_tree".to_string()));
        assert!(assembled.estimated_tokens > 0);
        assert!(assembled.estimated_tokens <= DEFAULT_MAX_TOKENS);
        // the huge file item must be truncated (not included whole), and recorded as such
        assert!(!assembled.user_context.contains(&"x".repeat(20_000)));
        assert!(assembled.truncated.contains(&"huge.py".to_string()));
        assert!(!assembled.included.contains(&"huge.py".to_string()));
    }

    #[test]
    fn assemble_partitions_memory_and_project_into_system_context() {
        let assembler = ContextAssembler::new();
        let items = vec![
            ContextItem::new(ItemCategory::Memory, "mem-1", "user prefers dark mode", 40),
            ContextItem::new(ItemCategory::History, "turn-1", "previous question", 70),
        ];
        let assembled = assembler.assemble(Intent::Chat, items, DEFAULT_MAX_TOKENS);
        assert!(assembled.system_context.contains("dark mode"));
        assert!(assembled.user_context.contains("previous question"));
    }

    #[test]
    fn assemble_enforces_global_max_tokens_ceiling() {
        let assembler = ContextAssembler::new();
        // Each item fits comfortably in its own category budget, but
        // together they exceed a tight global ceiling.
        let items = vec![
            ContextItem::new(ItemCategory::Selection, "sel", "a".repeat(4000), 100),
            ContextItem::new(ItemCategory::Cursor, "cursor", "b".repeat(4000), 90),
            ContextItem::new(ItemCategory::File, "file.py", "c".repeat(4000), 60),
        ];
        let assembled = assembler.assemble(Intent::Coding, items, 500);
        assert!(assembled.estimated_tokens <= 500);
        assert!(!assembled.excluded.is_empty() || !assembled.truncated.is_empty());
    }

    #[test]
    fn higher_priority_items_pack_before_lower_priority_ones_in_category() {
        let assembler = ContextAssembler::new();
        let items = vec![
            ContextItem::new(ItemCategory::Symbol, "low", "low priority snippet", 10),
            ContextItem::new(ItemCategory::Symbol, "high", "high priority snippet", 90),
        ];
        let assembled = assembler.assemble(Intent::Coding, items, DEFAULT_MAX_TOKENS);
        let high_pos = assembled.user_context.find("high priority snippet");
        let low_pos = assembled.user_context.find("low priority snippet");
        assert!(high_pos.is_some() && low_pos.is_some());
        assert!(high_pos < low_pos);
    }
}
