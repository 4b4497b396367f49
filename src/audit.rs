//! Long-response audit: find response strings over the length limit and walk
//! the operator through shortening them.

use crate::console::Console;
use crate::format::truncate_with_ellipsis;
use crate::store::{self, Document, TagEntry};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

pub const LONG_RESPONSE_LIMIT: usize = 150;
const PREVIEW_WIDTH: usize = 100;

/// One response over the limit. `index` is 0-based into the owning tag's
/// `responses`; `len` counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct LongResponse {
    pub author: String,
    pub tag: String,
    pub index: usize,
    pub text: String,
    pub len: usize,
}

pub fn scan_entry(author: &str, entry: &TagEntry) -> Vec<LongResponse> {
    entry
        .responses
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            let len = text.chars().count();
            (len > LONG_RESPONSE_LIMIT).then(|| LongResponse {
                author: author.to_string(),
                tag: entry.tag.clone(),
                index,
                text: text.clone(),
                len,
            })
        })
        .collect()
}

pub fn scan_document(doc: &Document) -> Vec<LongResponse> {
    let mut hits = Vec::new();
    for (author, record) in doc {
        for entry in &record.intents {
            hits.extend(scan_entry(author, entry));
        }
    }
    hits
}

#[derive(Debug, Clone, Copy)]
pub enum SortKey {
    LengthDesc,
    LengthAsc,
    Author,
    Tag,
}

pub fn sort_hits(hits: &mut [LongResponse], key: SortKey) {
    match key {
        SortKey::LengthDesc => hits.sort_by(|a, b| b.len.cmp(&a.len)),
        SortKey::LengthAsc => hits.sort_by(|a, b| a.len.cmp(&b.len)),
        SortKey::Author => hits.sort_by(|a, b| a.author.cmp(&b.author)),
        SortKey::Tag => hits.sort_by(|a, b| {
            (&a.author, &a.tag).cmp(&(&b.author, &b.tag))
        }),
    }
}

pub fn filter_by_length(
    hits: &[LongResponse],
    min: usize,
    max: usize,
) -> Vec<LongResponse> {
    hits.iter()
        .filter(|h| (min..=max).contains(&h.len))
        .cloned()
        .collect()
}

/// Write the replacement into the document and persist it. Returns false if
/// the target moved underneath us (tag renamed or response removed).
fn apply_edit(doc: &mut Document, hit: &LongResponse, new_text: String) -> bool {
    let Some(record) = doc.get_mut(&hit.author) else { return false };
    let Some(entry) =
        record.intents.iter_mut().find(|e| e.tag == hit.tag)
    else {
        return false;
    };
    if hit.index >= entry.responses.len() {
        return false;
    }
    entry.responses[hit.index] = new_text;
    true
}

fn save_and_report<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    path: &Path,
    doc: &Document,
) -> bool {
    match store::save(path, doc) {
        Ok(()) => {
            console.ok("Data saved.");
            true
        }
        Err(err) => {
            console.warn(&format!("Save failed: {err}"));
            false
        }
    }
}

fn show_hit_line<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    position: usize,
    hit: &LongResponse,
) {
    console.say(&format!(
        "{position}. [{}] {} - response {}",
        hit.author,
        hit.tag,
        hit.index + 1
    ));
    console.say(&format!("   length: {} chars", hit.len));
    console.say(&format!(
        "   preview: {}",
        truncate_with_ellipsis(&hit.text, PREVIEW_WIDTH)
    ));
}

fn display_hits<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    title: &str,
    hits: &[LongResponse],
) {
    console.say(&format!("\nFiltered: {title}"));
    console.say(&format!("Total: {} responses", hits.len()));
    for (i, hit) in hits.iter().enumerate() {
        show_hit_line(console, i + 1, hit);
    }
}

/// Interactive shortening of a single response. Returns whether the document
/// was changed and saved.
pub fn edit_hit<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    hit: &LongResponse,
) -> bool {
    console.say(&format!("\nOriginal response ({} chars):", hit.len));
    console.say(&"-".repeat(50));
    console.say(&hit.text);
    console.say(&"-".repeat(50));
    console.say("\n1. Rewrite from scratch");
    console.say("2. Edit as a single replacement line");
    console.say("3. Skip this response");

    match console.prompt_line("\nSelect action (1-3): ").as_deref() {
        Some("1") => rewrite_hit(console, doc, path, hit),
        Some("2") => replace_hit(console, doc, path, hit),
        Some("3") | None => {
            console.say("Skipped.");
            false
        }
        Some(_) => {
            console.warn("Invalid choice.");
            false
        }
    }
}

fn rewrite_hit<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    hit: &LongResponse,
) -> bool {
    console.say(&format!(
        "\nRewrite the response (aim for {LONG_RESPONSE_LIMIT} chars or \
         fewer)."
    ));
    console.say(
        "Finish with a blank line or 'done'; lines are joined with spaces.",
    );
    let Some(new_text) =
        console.collect_joined_lines("New response", LONG_RESPONSE_LIMIT)
    else {
        console.warn("Empty response; nothing changed.");
        return false;
    };
    confirm_and_apply(console, doc, path, hit, new_text)
}

fn replace_hit<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    hit: &LongResponse,
) -> bool {
    console.say("\nType the full replacement ('cancel' to abort):");
    let Some(new_text) = console.prompt_line("Replacement: ") else {
        return false;
    };
    if new_text.eq_ignore_ascii_case("cancel") {
        console.say("Edit cancelled.");
        return false;
    }
    if new_text.is_empty() {
        console.warn("Response must not be empty.");
        return false;
    }
    confirm_and_apply(console, doc, path, hit, new_text)
}

fn confirm_and_apply<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    hit: &LongResponse,
    new_text: String,
) -> bool {
    let new_len = new_text.chars().count();
    console.say("\nPreview of the change:");
    console.say(&format!("Before ({} chars): {}", hit.len, hit.text));
    console.say(&format!("After  ({new_len} chars): {new_text}"));
    if new_len > LONG_RESPONSE_LIMIT {
        console.warn(&format!("Still over {LONG_RESPONSE_LIMIT} characters."));
    } else {
        console.ok(&format!("Under {LONG_RESPONSE_LIMIT} characters now."));
    }
    if !console.confirm("\nSave this change?") {
        console.say("Change discarded.");
        return false;
    }
    if !apply_edit(doc, hit, new_text) {
        console.warn("Response no longer exists; nothing changed.");
        return false;
    }
    save_and_report(console, path, doc)
}

/// Walk a list of hits one by one with a continue/stop gate between items.
fn edit_many<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    hits: &[LongResponse],
) {
    console.say(&format!("\nResponses to edit: {}", hits.len()));
    if !console.confirm("Edit them one by one?") {
        console.say("Edit cancelled.");
        return;
    }
    let mut edited = 0usize;
    for (i, hit) in hits.iter().enumerate() {
        console.section(&format!(
            "EDITING RESPONSE {}/{} - [{}] {}",
            i + 1,
            hits.len(),
            hit.author,
            hit.tag
        ));
        if edit_hit(console, doc, path, hit) {
            edited += 1;
        }
        if i + 1 < hits.len()
            && !console.confirm("\nContinue to the next response?")
        {
            break;
        }
    }
    console.ok(&format!("Done. {edited} of {} responses edited.", hits.len()));
}

/// Audit one tag's responses.
pub fn run_tag_audit<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    author: &str,
    tag_index: usize,
) {
    let Some(entry) =
        doc.get(author).and_then(|r| r.intents.get(tag_index))
    else {
        return;
    };
    console.section(&format!("AUDIT RESPONSES - TAG: {} [{author}]", entry.tag));
    let hits = scan_entry(author, entry);
    if hits.is_empty() {
        console.ok(&format!(
            "No responses over {LONG_RESPONSE_LIMIT} characters."
        ));
        return;
    }
    console.warn(&format!(
        "Found {} responses over {LONG_RESPONSE_LIMIT} characters:",
        hits.len()
    ));
    for (i, hit) in hits.iter().enumerate() {
        show_hit_line(console, i + 1, hit);
    }

    console.say("\n1. Edit one response");
    console.say("2. Edit all long responses");
    console.say("3. Back");
    match console.prompt_line("\nSelect action (1-3): ").as_deref() {
        Some("1") => {
            let labels: Vec<String> = hits
                .iter()
                .map(|h| format!("response {} ({} chars)", h.index + 1, h.len))
                .collect();
            if let Some(i) = console.choose("response", &labels) {
                edit_hit(console, doc, path, &hits[i]);
            }
        }
        Some("2") => edit_many(console, doc, path, &hits),
        Some("3") | None => {}
        Some(_) => console.warn("Invalid choice."),
    }
}

/// Audit every response of every author and tag.
pub fn run_global_audit<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
) {
    console.section("GLOBAL AUDIT RESPONSES - ALL AUTHORS & TAGS");
    let mut hits = scan_document(doc);
    if hits.is_empty() {
        console.ok(&format!(
            "No responses over {LONG_RESPONSE_LIMIT} characters anywhere."
        ));
        return;
    }
    sort_hits(&mut hits, SortKey::LengthDesc);
    console.warn(&format!(
        "Found {} responses over {LONG_RESPONSE_LIMIT} characters:",
        hits.len()
    ));
    for (i, hit) in hits.iter().enumerate() {
        show_hit_line(console, i + 1, hit);
    }

    console.say("\n1. Edit one response");
    console.say("2. Edit responses of one author");
    console.say("3. Edit responses of one tag");
    console.say("4. Edit all long responses");
    console.say("5. Filter and display");
    console.say("6. Back");
    match console.prompt_line("\nSelect action (1-6): ").as_deref() {
        Some("1") => {
            let labels: Vec<String> = hits
                .iter()
                .map(|h| {
                    format!(
                        "[{}] {} - response {} ({} chars)",
                        h.author,
                        h.tag,
                        h.index + 1,
                        h.len
                    )
                })
                .collect();
            if let Some(i) = console.choose("response", &labels) {
                edit_hit(console, doc, path, &hits[i]);
            }
        }
        Some("2") => edit_grouped(console, doc, path, &hits, Group::Author),
        Some("3") => edit_grouped(console, doc, path, &hits, Group::Tag),
        Some("4") => edit_many(console, doc, path, &hits),
        Some("5") => filter_and_display(console, &hits),
        Some("6") | None => {}
        Some(_) => console.warn("Invalid choice."),
    }
}

enum Group {
    Author,
    Tag,
}

fn edit_grouped<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    hits: &[LongResponse],
    group: Group,
) {
    let mut grouped: BTreeMap<String, Vec<LongResponse>> = BTreeMap::new();
    for hit in hits {
        let key = match group {
            Group::Author => hit.author.clone(),
            Group::Tag => format!("[{}] {}", hit.author, hit.tag),
        };
        grouped.entry(key).or_default().push(hit.clone());
    }
    let labels: Vec<String> = grouped
        .iter()
        .map(|(key, group_hits)| {
            format!("{key} ({} responses)", group_hits.len())
        })
        .collect();
    let what = match group {
        Group::Author => "author",
        Group::Tag => "tag",
    };
    console.blank();
    let Some(i) = console.choose(what, &labels) else { return };
    let key = grouped.keys().nth(i).cloned().unwrap_or_default();
    if let Some(group_hits) = grouped.get(&key) {
        edit_many(console, doc, path, group_hits);
    }
}

fn filter_and_display<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    hits: &[LongResponse],
) {
    console.say("\n1. Filter by author");
    console.say("2. Filter by tag");
    console.say("3. Filter by length range");
    console.say("4. Show all, sorted");
    console.say("5. Back");
    match console.prompt_line("\nSelect filter (1-5): ").as_deref() {
        Some("1") => {
            let mut authors: Vec<String> =
                hits.iter().map(|h| h.author.clone()).collect();
            authors.sort();
            authors.dedup();
            let labels: Vec<String> = authors
                .iter()
                .map(|a| {
                    let count =
                        hits.iter().filter(|h| &h.author == a).count();
                    format!("{a} ({count} responses)")
                })
                .collect();
            if let Some(i) = console.choose("author", &labels) {
                let picked: Vec<LongResponse> = hits
                    .iter()
                    .filter(|h| h.author == authors[i])
                    .cloned()
                    .collect();
                display_hits(
                    console,
                    &format!("author {}", authors[i]),
                    &picked,
                );
            }
        }
        Some("2") => {
            let mut tags: Vec<(String, String)> = hits
                .iter()
                .map(|h| (h.author.clone(), h.tag.clone()))
                .collect();
            tags.sort();
            tags.dedup();
            let labels: Vec<String> = tags
                .iter()
                .map(|(author, tag)| {
                    let count = hits
                        .iter()
                        .filter(|h| &h.author == author && &h.tag == tag)
                        .count();
                    format!("[{author}] {tag} ({count} responses)")
                })
                .collect();
            if let Some(i) = console.choose("tag", &labels) {
                let (author, tag) = &tags[i];
                let picked: Vec<LongResponse> = hits
                    .iter()
                    .filter(|h| &h.author == author && &h.tag == tag)
                    .cloned()
                    .collect();
                display_hits(
                    console,
                    &format!("tag [{author}] {tag}"),
                    &picked,
                );
            }
        }
        Some("3") => {
            let min = prompt_bound(console, "Minimum length", 150);
            let max = prompt_bound(console, "Maximum length", 1000);
            let picked = filter_by_length(hits, min, max);
            display_hits(console, &format!("length {min}-{max}"), &picked);
        }
        Some("4") => {
            console.say("\n1. Length (longest first)");
            console.say("2. Length (shortest first)");
            console.say("3. Author (A-Z)");
            console.say("4. Tag (A-Z)");
            let key = match console
                .prompt_line("\nSelect sorting (1-4): ")
                .as_deref()
            {
                Some("1") => SortKey::LengthDesc,
                Some("2") => SortKey::LengthAsc,
                Some("3") => SortKey::Author,
                Some("4") => SortKey::Tag,
                _ => {
                    console.warn("Invalid choice.");
                    return;
                }
            };
            let mut sorted = hits.to_vec();
            sort_hits(&mut sorted, key);
            display_hits(console, "all long responses", &sorted);
        }
        Some("5") | None => {}
        Some(_) => console.warn("Invalid choice."),
    }
}

fn prompt_bound<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    label: &str,
    default: usize,
) -> usize {
    match console.prompt_line(&format!("{label} (default {default}): ")) {
        Some(raw) if !raw.is_empty() => raw.parse().unwrap_or_else(|_| {
            console.warn("Not a number; using the default.");
            default
        }),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatContext;
    use crate::store::AuthorRecord;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn doc_with(responses: Vec<&str>) -> Document {
        let mut doc = Document::new();
        let mut record = AuthorRecord::default();
        record.intents.push(TagEntry {
            tag: "greeting".to_string(),
            input: vec!["hi".to_string()],
            responses: responses.into_iter().map(String::from).collect(),
        });
        doc.insert("Alice".to_string(), record);
        doc
    }

    fn console(
        script: &str,
    ) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(
            Cursor::new(script.as_bytes().to_vec()),
            Vec::new(),
            FormatContext::new(false),
        )
    }

    #[test]
    fn scan_reports_only_over_limit_with_char_lengths() {
        let long = "x".repeat(151);
        let doc = doc_with(vec!["short", &long]);
        let hits = scan_document(&doc);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[0].len, 151);
        assert_eq!(hits[0].author, "Alice");
        assert_eq!(hits[0].tag, "greeting");
    }

    #[test]
    fn exactly_at_the_limit_is_not_a_hit() {
        let at_limit = "y".repeat(150);
        let doc = doc_with(vec![&at_limit]);
        assert!(scan_document(&doc).is_empty());
    }

    #[test]
    fn lengths_count_chars_not_bytes() {
        let accented = "é".repeat(120);
        let doc = doc_with(vec![&accented]);
        assert!(scan_document(&doc).is_empty());
    }

    #[test]
    fn sort_orders_by_key() {
        let a = "a".repeat(160);
        let b = "b".repeat(200);
        let doc = doc_with(vec![&a, &b]);
        let mut hits = scan_document(&doc);
        sort_hits(&mut hits, SortKey::LengthDesc);
        assert_eq!(hits[0].len, 200);
        sort_hits(&mut hits, SortKey::LengthAsc);
        assert_eq!(hits[0].len, 160);
    }

    #[test]
    fn length_range_filter_is_inclusive() {
        let a = "a".repeat(160);
        let b = "b".repeat(200);
        let doc = doc_with(vec![&a, &b]);
        let hits = scan_document(&doc);
        let picked = filter_by_length(&hits, 160, 160);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].len, 160);
    }

    #[test]
    fn rewrite_flow_saves_joined_lines() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.json");
        let long = "x".repeat(151);
        let mut doc = doc_with(vec![&long]);
        store::save(&path, &doc).unwrap();
        let hits = scan_document(&doc);

        // rewrite, two lines, blank terminator, then confirm save
        let mut c = console("1\nfirst half\nsecond half\n\ny\n");
        assert!(edit_hit(&mut c, &mut doc, &path, &hits[0]));

        let reloaded = store::load(&path).unwrap();
        assert_eq!(
            reloaded["Alice"].intents[0].responses[0],
            "first half second half"
        );
    }

    #[test]
    fn declined_confirmation_changes_nothing() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.json");
        let long = "x".repeat(151);
        let mut doc = doc_with(vec![&long]);
        store::save(&path, &doc).unwrap();
        let hits = scan_document(&doc);

        let mut c = console("2\nshorter text\nn\n");
        assert!(!edit_hit(&mut c, &mut doc, &path, &hits[0]));
        assert_eq!(doc["Alice"].intents[0].responses[0], long);
    }
}
