//! Interactive CRUD over the intent document. Menu choices are parsed into
//! explicit action enums and dispatched from a single loop; the document is
//! re-loaded at the top of every cycle and passed into each operation.

use crate::audit;
use crate::console::Console;
use crate::format::{FormatContext, truncate_with_ellipsis};
use crate::store::{self, AuthorRecord, Document, TagEntry};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;

const RESPONSE_PREVIEW_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    AddTag,
    DeleteTag,
    EditTag,
    ViewAll,
    GlobalAudit,
    Exit,
}

impl MainAction {
    pub fn from_choice(raw: &str) -> Option<Self> {
        match raw {
            "1" => Some(Self::AddTag),
            "2" => Some(Self::DeleteTag),
            "3" => Some(Self::EditTag),
            "4" => Some(Self::ViewAll),
            "5" => Some(Self::GlobalAudit),
            "6" => Some(Self::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    AddInput,
    AddResponse,
    DeleteInput,
    DeleteResponse,
    View,
    Audit,
    Back,
}

impl EditAction {
    pub fn from_choice(raw: &str) -> Option<Self> {
        match raw {
            "1" => Some(Self::AddInput),
            "2" => Some(Self::AddResponse),
            "3" => Some(Self::DeleteInput),
            "4" => Some(Self::DeleteResponse),
            "5" => Some(Self::View),
            "6" => Some(Self::Audit),
            "7" => Some(Self::Back),
            _ => None,
        }
    }
}

/// Which string list of a tag an operation targets.
#[derive(Debug, Clone, Copy)]
enum Field {
    Input,
    Responses,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Responses => "response",
        }
    }

    fn get(self, entry: &TagEntry) -> &Vec<String> {
        match self {
            Self::Input => &entry.input,
            Self::Responses => &entry.responses,
        }
    }

    fn get_mut(self, entry: &mut TagEntry) -> &mut Vec<String> {
        match self {
            Self::Input => &mut entry.input,
            Self::Responses => &mut entry.responses,
        }
    }
}

pub fn run_interactive() -> Result<(), Box<dyn Error>> {
    let path = store::data_file()?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(
        stdin.lock(),
        stdout.lock(),
        FormatContext::from_env(),
    );
    run(&mut console, &path)
}

pub fn run<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    console.say("Welcome to the intent tag manager.");
    console.say(&format!("Data file: {}", path.display()));
    loop {
        let mut doc = load_or_empty(console, path);
        console.section("INTENT TAG MANAGER");
        console.say("1. Add a tag");
        console.say("2. Delete a tag");
        console.say("3. Edit a tag");
        console.say("4. View all data");
        console.say(&format!(
            "5. Global audit responses > {} characters",
            audit::LONG_RESPONSE_LIMIT
        ));
        console.say("6. Exit");
        let Some(choice) = console.prompt_line("\nSelect menu (1-6): ")
        else {
            break;
        };
        let Some(action) = MainAction::from_choice(&choice) else {
            console.warn("Invalid choice.");
            continue;
        };
        match action {
            MainAction::AddTag => add_tag_flow(console, &mut doc, path),
            MainAction::DeleteTag => delete_tag_flow(console, &mut doc, path),
            MainAction::EditTag => edit_tag_flow(console, &mut doc, path),
            MainAction::ViewAll => view_all(console, &doc),
            MainAction::GlobalAudit => {
                audit::run_global_audit(console, &mut doc, path)
            }
            MainAction::Exit => {
                console.say("Goodbye.");
                break;
            }
        }
        console.pause();
    }
    Ok(())
}

fn load_or_empty<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    path: &Path,
) -> Document {
    match store::load(path) {
        Ok(doc) => doc,
        Err(err) => {
            console.warn(&format!(
                "Could not load {}: {err}",
                path.display()
            ));
            Document::new()
        }
    }
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

fn select_author<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &Document,
) -> Option<String> {
    if doc.is_empty() {
        console.warn("No authors available.");
        return None;
    }
    console.say("\nAvailable authors:");
    let authors: Vec<String> = doc.keys().cloned().collect();
    let labels: Vec<String> = authors
        .iter()
        .map(|a| format!("{a} ({} tags)", doc[a].intents.len()))
        .collect();
    let i = console.choose("author", &labels)?;
    Some(authors[i].clone())
}

fn select_tag<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    record: &AuthorRecord,
) -> Option<usize> {
    if record.intents.is_empty() {
        console.warn("No tags available.");
        return None;
    }
    console.say("\nAvailable tags:");
    let labels: Vec<String> = record
        .intents
        .iter()
        .map(|entry| {
            format!(
                "{} ({} inputs, {} responses)",
                entry.tag,
                entry.input.len(),
                entry.responses.len()
            )
        })
        .collect();
    console.choose("tag", &labels)
}

fn add_tag_flow<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
) {
    console.section("ADD A NEW TAG");
    let Some(author) = select_author(console, doc) else { return };
    let Some(name) = console.prompt_line("\nNew tag name: ") else {
        return;
    };
    if name.is_empty() {
        console.warn("Tag name must not be empty.");
        return;
    }
    let Some(record) = doc.get(&author) else { return };
    if record.intents.iter().any(|t| t.tag == name) {
        console.warn(&format!("Tag '{name}' already exists."));
        return;
    }

    let mut entry = TagEntry::new(name.clone());
    console.say(&format!("\nAdd inputs for tag '{name}':"));
    entry.input = console.collect_until_done("Input");
    console.say(&format!("\nAdd responses for tag '{name}':"));
    entry.responses = console.collect_until_done("Response");

    let Some(record) = doc.get_mut(&author) else { return };
    if let Err(err) = store::add_tag(record, entry) {
        console.warn(&err);
        return;
    }
    if save_and_report(console, path, doc) {
        console.ok(&format!("Tag '{name}' added for {author}."));
    }
}

fn delete_tag_flow<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
) {
    console.section("DELETE A TAG");
    let Some(author) = select_author(console, doc) else { return };
    let Some(record) = doc.get(&author) else { return };
    let Some(tag_index) = select_tag(console, record) else { return };
    let tag_name = record.intents[tag_index].tag.clone();

    if !console.confirm(&format!("Really delete tag '{tag_name}'?")) {
        console.say("Deletion cancelled.");
        return;
    }
    let Some(record) = doc.get_mut(&author) else { return };
    record.intents.remove(tag_index);
    if save_and_report(console, path, doc) {
        console.ok(&format!("Tag '{tag_name}' deleted."));
    }
}

fn edit_tag_flow<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
) {
    console.section("EDIT A TAG");
    let Some(author) = select_author(console, doc) else { return };
    let Some(record) = doc.get(&author) else { return };
    let Some(tag_index) = select_tag(console, record) else { return };

    loop {
        let Some(entry) =
            doc.get(&author).and_then(|r| r.intents.get(tag_index))
        else {
            break;
        };
        let tag_name = entry.tag.clone();
        console.section(&format!("EDITING TAG: {tag_name} [{author}]"));
        console.say("1. Add input");
        console.say("2. Add response");
        console.say("3. Delete input");
        console.say("4. Delete response");
        console.say("5. View current data");
        console.say(&format!(
            "6. Audit responses > {} characters",
            audit::LONG_RESPONSE_LIMIT
        ));
        console.say("7. Back to main menu");
        let Some(choice) = console.prompt_line("\nSelect action (1-7): ")
        else {
            break;
        };
        let Some(action) = EditAction::from_choice(&choice) else {
            console.warn("Invalid choice.");
            continue;
        };
        match action {
            EditAction::AddInput => {
                add_items_flow(console, doc, path, &author, tag_index, Field::Input)
            }
            EditAction::AddResponse => add_items_flow(
                console,
                doc,
                path,
                &author,
                tag_index,
                Field::Responses,
            ),
            EditAction::DeleteInput => delete_item_flow(
                console,
                doc,
                path,
                &author,
                tag_index,
                Field::Input,
            ),
            EditAction::DeleteResponse => delete_item_flow(
                console,
                doc,
                path,
                &author,
                tag_index,
                Field::Responses,
            ),
            EditAction::View => {
                if let Some(entry) =
                    doc.get(&author).and_then(|r| r.intents.get(tag_index))
                {
                    view_tag(console, entry);
                }
            }
            EditAction::Audit => {
                audit::run_tag_audit(console, doc, path, &author, tag_index)
            }
            EditAction::Back => break,
        }
    }
}

fn add_items_flow<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    author: &str,
    tag_index: usize,
    field: Field,
) {
    console.say(&format!(
        "\nAdding {}s (type 'done' to finish):",
        field.name()
    ));
    let mut added = 0usize;
    loop {
        let Some(raw) =
            console.prompt_line(&format!("New {}: ", field.name()))
        else {
            break;
        };
        if raw.eq_ignore_ascii_case("done") {
            break;
        }
        if raw.is_empty() {
            continue;
        }
        let Some(entry) = doc
            .get_mut(author)
            .and_then(|r| r.intents.get_mut(tag_index))
        else {
            return;
        };
        if store::push_unique(field.get_mut(entry), &raw) {
            added += 1;
            console.ok(&format!("Added '{raw}'."));
        } else {
            console.warn(&format!("'{raw}' is already present."));
        }
    }
    if added > 0 && save_and_report(console, path, doc) {
        console.ok(&format!("{added} new {}s added.", field.name()));
    }
}

fn delete_item_flow<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &mut Document,
    path: &Path,
    author: &str,
    tag_index: usize,
    field: Field,
) {
    let Some(entry) =
        doc.get(author).and_then(|r| r.intents.get(tag_index))
    else {
        return;
    };
    let list = field.get(entry);
    if list.is_empty() {
        console.warn(&format!("No {}s to delete.", field.name()));
        return;
    }
    console.say(&format!("\n{}s for tag '{}':", field.name(), entry.tag));
    let labels: Vec<String> = list
        .iter()
        .map(|item| truncate_with_ellipsis(item, RESPONSE_PREVIEW_WIDTH))
        .collect();
    let Some(i) = console.choose(field.name(), &labels) else { return };

    let Some(entry) = doc
        .get_mut(author)
        .and_then(|r| r.intents.get_mut(tag_index))
    else {
        return;
    };
    let removed = field.get_mut(entry).remove(i);
    if save_and_report(console, path, doc) {
        console.ok(&format!(
            "Removed '{}'.",
            truncate_with_ellipsis(&removed, RESPONSE_PREVIEW_WIDTH)
        ));
    }
}

fn view_tag<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    entry: &TagEntry,
) {
    console.section(&format!("TAG DATA: {}", entry.tag));
    console.say(&format!("\nInputs ({}):", entry.input.len()));
    for (i, input) in entry.input.iter().enumerate() {
        console.say(&format!("  {}. {input}", i + 1));
    }
    console.say(&format!("\nResponses ({}):", entry.responses.len()));
    for (i, response) in entry.responses.iter().enumerate() {
        console.say(&format!(
            "  {}. {}",
            i + 1,
            truncate_with_ellipsis(response, RESPONSE_PREVIEW_WIDTH)
        ));
    }
}

fn view_all<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    doc: &Document,
) {
    console.section("ALL DATA");
    if doc.is_empty() {
        console.say("No data yet.");
        return;
    }
    for (author, record) in doc {
        console.say(&format!("\n{author}:"));
        console.say(&format!("   total tags: {}", record.intents.len()));
        for entry in &record.intents {
            console.say(&format!(
                "   - {} ({} inputs, {} responses)",
                entry.tag,
                entry.input.len(),
                entry.responses.len()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn console(script: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(
            Cursor::new(script.as_bytes().to_vec()),
            Vec::new(),
            FormatContext::new(false),
        )
    }

    fn seeded_path(dir: &std::path::Path) -> std::path::PathBuf {
        let mut doc = Document::new();
        let mut record = AuthorRecord::default();
        record.intents.push(TagEntry {
            tag: "greeting".to_string(),
            input: vec!["hi".to_string()],
            responses: vec!["hello there".to_string()],
        });
        doc.insert("Alice".to_string(), record);
        let path = dir.join("data.json");
        store::save(&path, &doc).unwrap();
        path
    }

    #[test]
    fn main_action_mapping() {
        assert_eq!(MainAction::from_choice("1"), Some(MainAction::AddTag));
        assert_eq!(MainAction::from_choice("6"), Some(MainAction::Exit));
        assert_eq!(MainAction::from_choice("7"), None);
        assert_eq!(MainAction::from_choice("add"), None);
    }

    #[test]
    fn add_tag_flow_collects_and_saves() {
        let tmp = tempdir().unwrap();
        let path = seeded_path(tmp.path());
        // menu 1 -> author 1 -> name -> inputs -> responses -> pause -> exit
        let script =
            "1\n1\nfarewell\nbye\nsee you\ndone\ntake care\ndone\n\n6\n";
        let mut c = console(script);
        run(&mut c, &path).unwrap();

        let doc = store::load(&path).unwrap();
        let entry = doc["Alice"]
            .intents
            .iter()
            .find(|t| t.tag == "farewell")
            .expect("tag added");
        assert_eq!(entry.input, vec!["bye", "see you"]);
        assert_eq!(entry.responses, vec!["take care"]);
    }

    #[test]
    fn duplicate_tag_name_is_rejected_without_saving() {
        let tmp = tempdir().unwrap();
        let path = seeded_path(tmp.path());
        let before = std::fs::read_to_string(&path).unwrap();
        let script = "1\n1\ngreeting\n\n6\n";
        let mut c = console(script);
        run(&mut c, &path).unwrap();

        let after = std::fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn delete_tag_needs_confirmation() {
        let tmp = tempdir().unwrap();
        let path = seeded_path(tmp.path());
        // decline the confirmation; the tag must survive
        let script = "2\n1\n1\nn\n\n6\n";
        let mut c = console(script);
        run(&mut c, &path).unwrap();
        assert_eq!(store::load(&path).unwrap()["Alice"].intents.len(), 1);

        // accept it; the tag goes away
        let script = "2\n1\n1\ny\n\n6\n";
        let mut c = console(script);
        run(&mut c, &path).unwrap();
        assert!(store::load(&path).unwrap()["Alice"].intents.is_empty());
    }

    #[test]
    fn edit_tag_add_input_rejects_duplicates() {
        let tmp = tempdir().unwrap();
        let path = seeded_path(tmp.path());
        // edit tag -> add input: "hi" is a duplicate, "hey" is new
        let script = "3\n1\n1\n1\nhi\nhey\ndone\n7\n\n6\n";
        let mut c = console(script);
        run(&mut c, &path).unwrap();

        let doc = store::load(&path).unwrap();
        assert_eq!(doc["Alice"].intents[0].input, vec!["hi", "hey"]);
    }

    #[test]
    fn delete_response_by_index_removes_exactly_one() {
        let tmp = tempdir().unwrap();
        let mut doc = Document::new();
        let mut record = AuthorRecord::default();
        record.intents.push(TagEntry {
            tag: "greeting".to_string(),
            input: vec![],
            responses: vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string(),
            ],
        });
        doc.insert("Alice".to_string(), record);
        let path = tmp.path().join("data.json");
        store::save(&path, &doc).unwrap();

        // edit tag -> delete response -> pick 2 -> back -> exit
        let script = "3\n1\n1\n4\n2\n7\n\n6\n";
        let mut c = console(script);
        run(&mut c, &path).unwrap();

        let doc = store::load(&path).unwrap();
        assert_eq!(
            doc["Alice"].intents[0].responses,
            vec!["first", "third"]
        );
    }
}
