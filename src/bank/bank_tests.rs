use super::*;

fn scratch_bank() -> Bank {
    Bank::empty(std::path::Path::new("."), "Scratch")
}

#[test]
fn put_then_get_returns_the_split_lines() {
    let mut bank = scratch_bank();
    bank.put("Notes/Todo.txt", RecordKind::Code, "Buy milk\nCall Bob");
    let record = bank.get("Notes/Todo.txt").unwrap();
    assert_eq!(record.lines(), ["Buy milk", "Call Bob"]);
    assert_eq!(record.line_count(), 2);
    assert_eq!(record.content(), "Buy milk\nCall Bob");
}

#[test]
fn separator_styles_reach_the_same_record() {
    let mut bank = scratch_bank();
    bank.put("Notes/Todo.txt", RecordKind::Code, "Hello");
    assert_eq!(bank.get("Notes:Todo.txt").unwrap(), bank.get("Notes\\Todo.txt").unwrap());
    assert_eq!(bank.get("Notes->Todo.txt").unwrap().content(), "Hello");
    assert_eq!(bank.len(), 1);
}

#[test]
fn put_replaces_the_record_kind_too() {
    let mut bank = scratch_bank();
    bank.put("Images/A.png", RecordKind::Code, "not really an image");
    bank.put("Images/A.png", RecordKind::Link, "ignored");
    assert_eq!(bank.get("Images/A.png").unwrap(), &Record::Link);
    assert_eq!(bank.len(), 1);
}

#[test]
fn empty_code_data_stores_zero_lines() {
    let mut bank = scratch_bank();
    bank.put("Empty.txt", RecordKind::Code, "");
    assert_eq!(bank.get("Empty.txt").unwrap().line_count(), 0);
    bank.put("Blanks.txt", RecordKind::Code, "\n\n\n");
    assert_eq!(bank.get("Blanks.txt").unwrap().line_count(), 0);
}

#[test]
fn get_missing_key_is_not_found() {
    let bank = scratch_bank();
    let err = bank.get("Nope.txt").unwrap_err();
    assert_eq!(err, AppError::not_found("Nope.txt does not exist."));
}

#[test]
fn delete_removes_the_key_for_good() {
    let mut bank = scratch_bank();
    bank.put("Notes/Todo.txt", RecordKind::Code, "x");
    bank.delete("Notes/Todo.txt").unwrap();
    assert!(bank.get("Notes/Todo.txt").is_err());
    assert!(bank.browse_by_folder("Notes").is_empty());
    assert!(bank.browse_by_folder("").is_empty());
    // A second delete of the same key fails the same way as a miss.
    assert_eq!(
        bank.delete("Notes/Todo.txt").unwrap_err(),
        AppError::not_found("Notes->Todo.txt was not found.")
    );
}

#[test]
fn browse_is_a_plain_prefix_test_including_siblings() {
    let mut bank = scratch_bank();
    bank.put("A/B/x.txt", RecordKind::Code, "x");
    bank.put("A/B2/y.txt", RecordKind::Code, "y");
    bank.put("C/z.txt", RecordKind::Code, "z");
    // Prefix A->B matches the sibling folder A->B2 as well; inherited
    // behavior, kept as-is.
    assert_eq!(bank.browse_by_folder("A/B"), vec!["A->B->x.txt", "A->B2->y.txt"]);
    assert_eq!(bank.browse_by_folder("A/B/"), vec!["A->B->x.txt"]);
}

#[test]
fn query_files_filters_browsed_keys() {
    let mut bank = scratch_bank();
    bank.put("Images/A.png", RecordKind::Link, "");
    bank.put("Images/B.jpg", RecordKind::Link, "");
    bank.put("Docs/C.png", RecordKind::Link, "");
    assert_eq!(bank.query_files("Images", "*png"), vec!["Images->A.png"]);
    assert_eq!(bank.query_files("Images", "png,jpg"), vec!["Images->A.png", "Images->B.jpg"]);
    assert_eq!(bank.query_files("Images", "all"), vec!["Images->A.png", "Images->B.jpg"]);
    assert!(bank.query_files("Images", "*gif").is_empty());
}

#[test]
fn save_then_load_round_trips_every_record() {
    let tmp = tempfile::tempdir().unwrap();
    let mut bank = Bank::empty(tmp.path(), "Site");
    bank.put("Notes/Todo.txt", RecordKind::Code, "Buy milk\nCall Bob");
    bank.put("Pages/Index.html", RecordKind::Code, "<html>\n</html>");
    bank.put("Images/A.png", RecordKind::Link, "");
    bank.save().unwrap();

    let reloaded = Bank::load(tmp.path(), "Site").unwrap();
    assert_eq!(reloaded.records(), bank.records());
    assert_eq!(reloaded.name(), "Site");
}

#[test]
fn load_missing_file_propagates_io() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(matches!(Bank::load(tmp.path(), "Absent").unwrap_err(), AppError::Io { .. }));
}

#[test]
fn load_malformed_file_is_a_format_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = Bank::file_path(tmp.path(), "Broken");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "object\ntype=code\ncount=1\nend\nline").unwrap();
    assert_eq!(
        Bank::load(tmp.path(), "Broken").unwrap_err(),
        AppError::format("Missing file name.")
    );
}

#[test]
fn record_kind_parses_only_the_two_kinds() {
    assert_eq!(RecordKind::parse("code").unwrap(), RecordKind::Code);
    assert_eq!(RecordKind::parse("link").unwrap(), RecordKind::Link);
    assert_eq!(RecordKind::parse("blob").unwrap_err(), AppError::format("Not code or link."));
}

#[test]
fn create_from_directory_classifies_by_mime() {
    let tmp = tempfile::tempdir().unwrap();
    let site = tmp.path().join("Site");
    std::fs::create_dir_all(site.join("Images")).unwrap();
    std::fs::write(site.join("Page.html"), "<html></html>").unwrap();
    std::fs::write(site.join("Images").join("A.png"), [0x89u8, 0x50, 0x4e, 0x47]).unwrap();
    std::fs::write(site.join("Readme.nope"), "unknown extension").unwrap();

    let mut program = Bank::empty(tmp.path(), "Program");
    program.put("Config/Mime.txt", RecordKind::Code, "html=text/html,false\npng=image/png,true");
    let mime = MimeTable::load(&program, "Mime").unwrap();

    let mut bank = Bank::empty(tmp.path(), "Site");
    let added = bank.create_from_directory(&site, &mime).unwrap();
    assert_eq!(added, 2);
    assert_eq!(bank.get("Site/Page.html").unwrap().content(), "<html></html>");
    assert_eq!(bank.get("Site/Images/A.png").unwrap(), &Record::Link);
    assert!(bank.get("Site/Readme.nope").is_err());
}
