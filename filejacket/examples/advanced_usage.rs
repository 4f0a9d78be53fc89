use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use filejacket::serializer::{self, SerializeOptions};
use filejacket::storage::LocalStorage;
use filejacket::{ContentSource, File, KnownMimeTyper, RenameSession, SaveOptions, Storage};

fn write_sample_zip(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    writer.start_file("docs/readme.md", options)?;
    writer.write_all(b"# Bundle\nShipped inside a zip.\n")?;
    writer.start_file("data/values.csv", options)?;
    writer.write_all(b"id,value\n1,42\n")?;
    writer.finish()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = tempdir()?;
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());
    let mimetyper = KnownMimeTyper::new_arc();

    // --- Look inside an archive ---
    let archive_path = dir.path().join("bundle.zip");
    write_sample_zip(&archive_path)?;
    println!("Archive written to {:?}", archive_path);

    let mut archive = File::from_disk(&archive_path.to_string_lossy(), storage.clone(), mimetyper.clone());
    assert!(archive.meta.packed);

    println!("\nListing the archive entries...");
    archive.files();
    for (name, entry) in archive.packet.iter() {
        println!("  - {} ({} bytes, crc32: {:?})", name, entry.length, entry.file.hashes.digest_of("crc32"));
    }
    assert_eq!(archive.packet.len(), 2);

    // Nested content is decompressed only when actually read.
    println!("\nReading one entry through its lazy stream...");
    let readme = archive.internal_file("docs/readme.md").unwrap();
    let mut text = Vec::new();
    for block in readme.content_controller_mut().unwrap().blocks() {
        text.extend(block?);
    }
    println!("  docs/readme.md -> {:?}", String::from_utf8_lossy(&text));

    // --- Decompress everything ---
    let out = tempdir()?;
    println!("\nExtracting the archive to {:?}...", out.path());
    let accepted = archive.extract(Some(&out.path().to_string_lossy()), false)?;
    assert!(accepted);
    println!("  extracted: {:?}", storage.list_files(&out.path().join("data").to_string_lossy())?);

    // --- Serialize the object, content left out ---
    println!("\nSerializing the archive object without content...");
    archive.generate_hashes(false);
    let json = serializer::to_json(&mut archive, &SerializeOptions::default())?;
    println!("  payload size: {} characters", json.len());

    let restored = serializer::from_json(&json, storage.clone(), mimetyper.clone())?;
    assert_eq!(restored.hashes.digest_of("sha256"), archive.hashes.digest_of("sha256"));
    assert_eq!(restored.packet.names(), archive.packet.names());
    println!("Restored object carries the same digests and packet entries.");

    // --- Saves sharing a rename session ---
    println!("\nSaving two objects under one name through a shared session...");
    let drop_dir = tempdir()?;
    let mut session = RenameSession::new();

    let mut first = File::from_content(
        ContentSource::Text("first body".to_string()),
        &Default::default(),
        storage.clone(),
        mimetyper.clone(),
    );
    first.filename = Some("report".to_string());
    first.extension = Some("txt".to_string());
    first.save_to = Some(drop_dir.path().to_string_lossy().into_owned());
    first.state.renaming = true;
    first.save_with(&SaveOptions::default(), &mut session)?;

    let mut second = File::from_content(
        ContentSource::Text("second body".to_string()),
        &Default::default(),
        storage.clone(),
        mimetyper,
    );
    second.filename = Some("report".to_string());
    second.extension = Some("txt".to_string());
    second.save_to = Some(drop_dir.path().to_string_lossy().into_owned());
    second.state.adding = false;
    second.state.changing = true;
    second.state.renaming = true;
    second.save_with(
        &SaveOptions {
            allow_update: true,
            allow_rename: true,
            ..SaveOptions::default()
        },
        &mut session,
    )?;

    println!("  first kept:   {:?}", first.complete_filename());
    println!("  second chose: {:?}", second.complete_filename());
    assert_eq!(second.complete_filename().as_deref(), Some("report (1).txt"));
    println!("  directory: {:?}", storage.list_files(&drop_dir.path().to_string_lossy())?);

    println!("\nExample finished successfully!");
    Ok(())
}
