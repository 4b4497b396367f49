//! Interactive synchronization with the remote tag endpoint: push flows over
//! the local document plus management of already-published tags. Mirrors the
//! editor's shape: action enums dispatched from a single loop, document
//! re-loaded each cycle.

use crate::api::{ApiClient, FallbackReport, Health, RemoteTag, SendReport};
use crate::console::{self, Console};
use crate::format::{FormatContext, truncate_with_ellipsis};
use crate::store::{self, Document, TagEntry};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

const DEFAULT_PUSH_DELAY_MS: u64 = 2000;
const PREVIEW_WIDTH: usize = 50;

/// Fixed pause between successive calls so the remote is not hammered.
pub fn push_delay() -> Duration {
    std::env::var("INTENT_TAGS_PUSH_DELAY_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_PUSH_DELAY_MS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    PushAll,
    PushByAuthor,
    PushTag,
    Preview,
    TestSingle,
    Connectivity,
    ManageRemote,
    Exit,
}

impl SyncAction {
    pub fn from_choice(raw: &str) -> Option<Self> {
        match raw {
            "1" => Some(Self::PushAll),
            "2" => Some(Self::PushByAuthor),
            "3" => Some(Self::PushTag),
            "4" => Some(Self::Preview),
            "5" => Some(Self::TestSingle),
            "6" => Some(Self::Connectivity),
            "7" => Some(Self::ManageRemote),
            "8" => Some(Self::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteAction {
    List,
    DeleteTags,
    DeleteByAuthor,
    EditFields,
    Back,
}

impl RemoteAction {
    fn from_choice(raw: &str) -> Option<Self> {
        match raw {
            "1" => Some(Self::List),
            "2" => Some(Self::DeleteTags),
            "3" => Some(Self::DeleteByAuthor),
            "4" => Some(Self::EditFields),
            "5" => Some(Self::Back),
            _ => None,
        }
    }
}

pub fn run_interactive() -> Result<(), Box<dyn Error>> {
    let path = store::data_file()?;
    let client = ApiClient::from_env()?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(
        stdin.lock(),
        stdout.lock(),
        FormatContext::from_env(),
    );
    run(&mut console, &client, &path, push_delay())
}

pub fn run<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    path: &Path,
    delay: Duration,
) -> Result<(), Box<dyn Error>> {
    console.say("Welcome to the intent tag sync client.");
    console.say(&format!("Data file: {}", path.display()));
    loop {
        let doc = load_or_empty(console, path);
        console.section("PUSH DATA TO API - CHATBOT TAGS");
        console.say(&format!("Target: {}", client.base_url()));
        console.say("\n1. Push all data");
        console.say("2. Push by author");
        console.say("3. Push specific tag");
        console.say("4. Preview data");
        console.say("5. Test single request");
        console.say("6. Check endpoint connectivity");
        console.say("7. Manage remote tags");
        console.say("8. Exit");
        let Some(choice) = console.prompt_line("\nSelect menu (1-8): ")
        else {
            break;
        };
        let Some(action) = SyncAction::from_choice(&choice) else {
            console.warn("Invalid choice.");
            continue;
        };
        match action {
            SyncAction::PushAll => push_all(console, client, &doc, delay),
            SyncAction::PushByAuthor => {
                push_by_author(console, client, &doc, delay)
            }
            SyncAction::PushTag => push_specific_tag(console, client, &doc),
            SyncAction::Preview => preview(console, client, &doc),
            SyncAction::TestSingle => test_single(console, client, &doc),
            SyncAction::Connectivity => connectivity(console, client),
            SyncAction::ManageRemote => manage_remote(console, client, delay),
            SyncAction::Exit => {
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

fn report_send<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    report: &SendReport,
) {
    match report.status {
        Some(status) => {
            console.say(&format!("   response status: {status}"));
            if report.success {
                if !report.detail.is_empty() {
                    console.say(&format!("   message: {}", report.detail));
                }
            } else {
                console.warn(&format!("   response: {}", report.detail));
            }
        }
        None => console.warn(&format!("   {}", report.detail)),
    }
}

/// Send every job in order, one POST per tag, sleeping between calls but not
/// after the last one. Returns the (success, failed) tally.
fn push_entries<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    delay: Duration,
    jobs: &[(&str, &TagEntry)],
) -> (usize, usize) {
    let total = jobs.len();
    let mut success = 0usize;
    let mut failed = 0usize;
    for (i, (author, entry)) in jobs.iter().enumerate() {
        console.say(&format!(
            "\n[{}/{total}] Sending [{author}] tag: {}",
            i + 1,
            entry.tag
        ));
        let report = client.send_tag(entry, author);
        report_send(console, &report);
        if report.success {
            success += 1;
            console.ok(&format!("   success count: {success}"));
        } else {
            failed += 1;
            console.warn(&format!("   failed count: {failed}"));
        }
        if i + 1 < total {
            console.say(&format!("   waiting {} ms...", delay.as_millis()));
            thread::sleep(delay);
        }
    }
    (success, failed)
}

fn push_summary<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    title: &str,
    success: usize,
    failed: usize,
) {
    let total = success + failed;
    console.section(&format!("PUSH SUMMARY - {title}"));
    console.say(&format!("Pushed: {success}/{total}"));
    console.say(&format!("Failed: {failed}/{total}"));
    if total > 0 {
        let rate = success as f64 / total as f64 * 100.0;
        console.say(&format!("Success rate: {rate:.1}%"));
    }
    if failed == 0 {
        console.ok("All tags pushed.");
    } else {
        console.warn(&format!("{failed} tags failed to push."));
    }
}

fn push_all<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    doc: &Document,
    delay: Duration,
) {
    let jobs: Vec<(&str, &TagEntry)> = doc
        .iter()
        .flat_map(|(author, record)| {
            record.intents.iter().map(move |entry| (author.as_str(), entry))
        })
        .collect();
    if jobs.is_empty() {
        console.warn("Nothing to push.");
        return;
    }
    console.say(&format!("\nTotal tags to push: {}", jobs.len()));
    console.say(&format!("Target URL: {}", client.base_url()));
    if !console.confirm("Push ALL tags to the API?") {
        console.say("Push cancelled.");
        return;
    }
    let (success, failed) = push_entries(console, client, delay, &jobs);
    push_summary(console, "ALL DATA", success, failed);
}

fn push_by_author<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    doc: &Document,
    delay: Duration,
) {
    let Some(author) = select_author(console, doc) else { return };
    let Some(record) = doc.get(&author) else { return };
    let jobs: Vec<(&str, &TagEntry)> = record
        .intents
        .iter()
        .map(|entry| (author.as_str(), entry))
        .collect();
    if jobs.is_empty() {
        console.warn("This author has no tags.");
        return;
    }
    console.say(&format!("\nPushing {} tags for {author}...", jobs.len()));
    let (success, failed) = push_entries(console, client, delay, &jobs);
    push_summary(console, &author, success, failed);
}

fn push_specific_tag<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    doc: &Document,
) {
    let Some(author) = select_author(console, doc) else { return };
    let Some(record) = doc.get(&author) else { return };
    if record.intents.is_empty() {
        console.warn("This author has no tags.");
        return;
    }
    console.say(&format!("\nAvailable tags for {author}:"));
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
    let Some(i) = console.choose("tag", &labels) else { return };
    let entry = &record.intents[i];

    console.say(&format!("\nPushing tag: {} for {author}", entry.tag));
    let report = client.send_tag(entry, &author);
    report_send(console, &report);
    if report.success {
        console.ok("Tag pushed.");
    } else {
        console.warn("Failed to push tag.");
    }
}

fn preview<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    doc: &Document,
) {
    console.section("DATA PREVIEW");
    console.say(&format!("Target URL: {}", client.base_url()));
    if doc.is_empty() {
        console.say("No data yet.");
        return;
    }
    for (author, record) in doc {
        console.say(&format!(
            "\n{author} ({} tags):",
            record.intents.len()
        ));
        for (i, entry) in record.intents.iter().enumerate() {
            console.say(&format!("\n   {}. {}", i + 1, entry.tag));
            console.say(&format!("      inputs: {}", entry.input.len()));
            console.say(&format!(
                "      responses: {}",
                entry.responses.len()
            ));
            // Clipped sample of what send_tag would put on the wire.
            let inputs: Vec<&str> =
                entry.input.iter().take(2).map(String::as_str).collect();
            let responses: Vec<String> = entry
                .responses
                .iter()
                .take(1)
                .map(|r| truncate_with_ellipsis(r, PREVIEW_WIDTH))
                .collect();
            console.say("      payload structure:");
            console.say(&format!("         tag: {:?}", entry.tag));
            console.say(&format!("         nama: {author:?}"));
            console.say(&format!("         input: {inputs:?}"));
            console.say(&format!("         responses: {responses:?}"));
        }
    }
}

fn test_single<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    doc: &Document,
) {
    console.section("TEST SINGLE REQUEST");
    let Some((author, entry)) = doc
        .iter()
        .find_map(|(a, r)| r.intents.first().map(|e| (a, e)))
    else {
        console.warn("No data to send.");
        return;
    };
    console.say(&format!("Author: {author}"));
    console.say(&format!("Tag: {}", entry.tag));
    console.say(&format!("Inputs: {}", entry.input.len()));
    console.say(&format!("Responses: {}", entry.responses.len()));
    let payload = crate::api::tag_payload(entry, author);
    if let Ok(rendered) = serde_json::to_string_pretty(&payload) {
        console.say("\nPayload to send:");
        console.say(&rendered);
    }
    if !console.confirm("\nSend this test request?") {
        console.say("Test cancelled.");
        return;
    }
    let report = client.send_tag(entry, author);
    report_send(console, &report);
    if report.success {
        console.ok("Test request succeeded.");
    } else {
        console.warn("Test request failed.");
    }
}

fn connectivity<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
) {
    console.section("ENDPOINT CONNECTIVITY");
    console.say(&format!("Probing {} ...", client.base_url()));
    let report = client.check_connectivity();
    match &report.get {
        Ok((status, body)) => {
            console.say(&format!("GET response: {status}"));
            console.say(&format!("   {body}"));
        }
        Err(err) => console.warn(&format!("GET failed: {err}")),
    }
    match &report.post {
        Ok((status, body)) => {
            console.say(&format!("POST response: {status}"));
            console.say(&format!("   {body}"));
        }
        Err(err) => console.warn(&format!("POST failed: {err}")),
    }
    match report.health {
        Health::Working => console.ok("Endpoint is working."),
        Health::NotFound => console.warn("Endpoint not found (404)."),
        Health::MethodNotAllowed => {
            console.warn("Method not allowed (405).")
        }
        Health::Unexpected(status) => {
            console.warn(&format!("Unexpected status: {status}"))
        }
        Health::Unreachable => console.warn("Connection error."),
    }
}

fn manage_remote<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    delay: Duration,
) {
    loop {
        console.section("MANAGE REMOTE TAGS");
        console.say("1. List remote tags");
        console.say("2. Delete specific tag(s)");
        console.say("3. Delete by author");
        console.say("4. Edit inputs/responses");
        console.say("5. Back");
        let Some(choice) = console.prompt_line("\nSelect action (1-5): ")
        else {
            break;
        };
        let Some(action) = RemoteAction::from_choice(&choice) else {
            console.warn("Invalid choice.");
            continue;
        };
        match action {
            RemoteAction::List => {
                if let Some(tags) = fetch_or_report(console, client) {
                    list_remote(console, &tags);
                }
            }
            RemoteAction::DeleteTags => {
                delete_specific(console, client, delay)
            }
            RemoteAction::DeleteByAuthor => {
                delete_by_author(console, client, delay)
            }
            RemoteAction::EditFields => edit_fields(console, client),
            RemoteAction::Back => break,
        }
    }
}

fn fetch_or_report<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
) -> Option<Vec<RemoteTag>> {
    console.say("\nFetching remote tags...");
    match client.fetch_tags() {
        Ok(tags) if tags.is_empty() => {
            console.warn("No tags on the remote.");
            None
        }
        Ok(tags) => {
            console.say(&format!("Fetched {} tags.", tags.len()));
            Some(tags)
        }
        Err(err) => {
            console.warn(&format!("Fetch failed: {err}"));
            None
        }
    }
}

fn list_remote<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    tags: &[RemoteTag],
) {
    for (i, tag) in tags.iter().enumerate() {
        console.say(&format!(
            "{}. [{}] {} ({} inputs, {} responses, id {})",
            i + 1,
            tag.nama,
            tag.tag,
            tag.input.len(),
            tag.responses.len(),
            tag.id.as_deref().unwrap_or("-")
        ));
    }
}

fn report_fallback<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    report: &FallbackReport,
) {
    for attempt in &report.attempts {
        let line = format!("   {} -> {}", attempt.label, attempt.detail);
        if attempt.ok {
            console.ok(&line);
        } else {
            console.warn(&line);
        }
    }
    if !report.succeeded {
        console.warn("   every attempt failed");
    }
}

/// Loop until a parsable index selection or cancellation.
fn prompt_selection<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    prompt: &str,
    len: usize,
) -> Option<Vec<usize>> {
    loop {
        let raw = console.prompt_line(prompt)?;
        if raw.eq_ignore_ascii_case("cancel")
            || raw.eq_ignore_ascii_case("back")
        {
            return None;
        }
        match console::parse_index_selection(&raw, len) {
            Some(picked) => return Some(picked),
            None => console.warn("Invalid selection."),
        }
    }
}

fn delete_remote_batch<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    delay: Duration,
    targets: &[&RemoteTag],
) {
    let total = targets.len();
    let mut deleted = 0usize;
    for (i, tag) in targets.iter().enumerate() {
        console.say(&format!(
            "\n[{}/{total}] Deleting [{}] {}",
            i + 1,
            tag.nama,
            tag.tag
        ));
        let report =
            client.delete_tag(tag.id.as_deref(), &tag.tag, &tag.nama);
        report_fallback(console, &report);
        if report.succeeded {
            deleted += 1;
        }
        if i + 1 < total {
            console.say(&format!("   waiting {} ms...", delay.as_millis()));
            thread::sleep(delay);
        }
    }
    console.say(&format!("\nDeleted {deleted} of {total} tags."));
}

fn delete_specific<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    delay: Duration,
) {
    let Some(tags) = fetch_or_report(console, client) else { return };
    console.blank();
    list_remote(console, &tags);
    let Some(picked) = prompt_selection(
        console,
        "\nTags to delete (e.g. 2 or 1,3, or cancel): ",
        tags.len(),
    ) else {
        return;
    };
    console.say("\nSelected for deletion:");
    // picked is descending 0-based
    for &i in &picked {
        console.say(&format!("   [{}] {}", tags[i].nama, tags[i].tag));
    }
    if !console.confirm(&format!("Delete {} tag(s)?", picked.len())) {
        console.say("Deletion cancelled.");
        return;
    }
    let targets: Vec<&RemoteTag> = picked.iter().map(|&i| &tags[i]).collect();
    delete_remote_batch(console, client, delay, &targets);
}

fn delete_by_author<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
    delay: Duration,
) {
    let Some(tags) = fetch_or_report(console, client) else { return };
    let mut grouped: BTreeMap<&str, Vec<&RemoteTag>> = BTreeMap::new();
    for tag in &tags {
        grouped.entry(tag.nama.as_str()).or_default().push(tag);
    }
    let authors: Vec<&str> = grouped.keys().copied().collect();
    let labels: Vec<String> = authors
        .iter()
        .map(|a| format!("{a} ({} tags)", grouped[a].len()))
        .collect();
    console.say("\nRemote authors:");
    let Some(i) = console.choose("author", &labels) else { return };
    let author = authors[i];
    let targets = &grouped[author];
    if !console.confirm(&format!(
        "Delete all {} tags of {author}?",
        targets.len()
    )) {
        console.say("Deletion cancelled.");
        return;
    }
    delete_remote_batch(console, client, delay, targets);
}

fn edit_fields<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &ApiClient,
) {
    let Some(tags) = fetch_or_report(console, client) else { return };
    console.blank();
    list_remote(console, &tags);
    let Some(i) = console.prompt_index(
        &format!("\nSelect tag (1-{}, or cancel): ", tags.len()),
        tags.len(),
    ) else {
        return;
    };
    let mut copy = tags[i].clone();

    console.say("\n1. Edit inputs");
    console.say("2. Edit responses");
    let list = match console.prompt_line("\nSelect field (1-2): ").as_deref()
    {
        Some("1") => &mut copy.input,
        Some("2") => &mut copy.responses,
        _ => {
            console.warn("Invalid choice.");
            return;
        }
    };
    if list.is_empty() {
        console.warn("Nothing to edit in that field.");
        return;
    }
    console.say("\nCurrent entries:");
    for (j, item) in list.iter().enumerate() {
        console.say(&format!(
            "{}. {}",
            j + 1,
            truncate_with_ellipsis(item, PREVIEW_WIDTH)
        ));
    }
    let Some(picked) = prompt_selection(
        console,
        "\nEntries to remove (e.g. 2 or 1,3, or cancel): ",
        list.len(),
    ) else {
        return;
    };
    for &j in &picked {
        list.remove(j);
    }
    console.say("\nRemaining entries:");
    for (j, item) in list.iter().enumerate() {
        console.say(&format!(
            "{}. {}",
            j + 1,
            truncate_with_ellipsis(item, PREVIEW_WIDTH)
        ));
    }

    // Edits live only in the fetched copy until explicitly pushed back.
    if !console.confirm("\nSave changes to the API?") {
        console.say("Changes discarded.");
        return;
    }
    let payload = json!({
        "tag": copy.tag,
        "nama": copy.nama,
        "input": copy.input,
        "responses": copy.responses,
    });
    let report = client.update_tag(copy.id.as_deref(), &payload);
    report_fallback(console, &report);
    if report.succeeded {
        console.ok("Remote tag updated.");
    } else {
        console.warn("Update failed; the remote copy is unchanged.");
    }
}
