//! JSON serialization of file objects.
//!
//! A file object becomes a flat attribute map: processor bindings are
//! stored under their registry identifiers, datetimes as tagged RFC 3339
//! strings, and nested objects (hash sidecars, packet entries, previews)
//! as embedded maps of the same shape. Content is excluded by default;
//! [`SerializeOptions::include_content`] embeds it as base64.
//!
//! Runtime wiring never travels: the storage and mimetype backends are
//! injected again on restore, rename ownership tokens are reissued, and
//! pipeline run state starts clean.
//!
//! // 序列化子系统:文件对象与 JSON 之间的互转。处理器按注册 id 存字符串,
//! // 时间存带标签的 RFC 3339,旁车/包内条目/预览递归嵌套;内容默认不带,
//! // 可选 base64 内嵌。存储与 mimetype 后端属于运行期装配,恢复时重新注入。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::common::constants::{SERIALIZED_SOURCE_KEY, SERIALIZED_VERSION_KEY};
use crate::content::source::ContentSource;
use crate::content::{BufferAdapter, ContentError, Payload};
use crate::file::File;
use crate::mimetype::MimeTyper;
use crate::pipeline::{Pipeline, ProcessorBinding};
use crate::storage::Storage;
use crate::utils::datetime;

/// Marker value stored under the source key of every serialized file.
pub const FILE_SOURCE: &str = "filejacket.file";

/// Format version this build writes and accepts.
pub const FORMAT_VERSION: u64 = 1;

/// Errors of serialization and restoration.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// The value does not carry this serializer's marker.
    #[error("The value was not written by this serializer (source marker: {found})")]
    UnknownSource { found: String },

    #[error("Serialized format version {found} is not supported")]
    UnsupportedVersion { found: u64 },

    /// A field exists but has the wrong JSON shape.
    #[error("Serialized field {field} has an unexpected shape")]
    MalformedField { field: &'static str },

    #[error("Datetime attribute cannot be parsed: {value}")]
    BadDatetime { value: String },

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("JSON handling failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 payload cannot be decoded: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Knobs of [`to_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Embed the content bytes as base64. Requires the content to be
    /// readable; lazy archive entries get materialized on the way.
    pub include_content: bool,
}

/// Serializes a file object into a JSON value.
///
/// The file is taken mutably because embedding content may have to
/// drive the controller to materialize the bytes first.
///
/// // 序列化入口;要可变引用是因为内嵌内容时可能需要先物化。
pub fn to_value(file: &mut File, options: &SerializeOptions) -> Result<Value, SerializeError> {
    // 1. 内容最先处理,base64 编码需要可变访问控制器。
    let content_value = if options.include_content {
        match file.content.as_mut() {
            Some(content) => {
                let encoded = content.content_as_base64()?;
                json!({ "binary": content.is_binary(), "base64": encoded })
            }
            None => Value::Null,
        }
    } else {
        Value::Null
    };

    // 2. 哈希旁车递归序列化。
    let mut hashes_value = Map::new();
    for (name, record) in file.hashes.iter_mut() {
        let sidecar_value = to_value(record.sidecar.as_mut(), options)?;
        hashes_value.insert(
            name.clone(),
            json!({ "digest": record.digest, "sidecar": sidecar_value }),
        );
    }

    // 3. 包内条目递归序列化,条目顺序保持插入顺序。
    let unpacked_length = file.packet.unpacked_length();
    let packet_pipeline = pipeline_value(&file.packet.pipeline)?;
    let names: Vec<String> = file.packet.names().into_iter().map(str::to_string).collect();
    let mut entries_value = Vec::with_capacity(names.len());
    for name in names {
        let Some(entry) = file.packet.get_mut(&name) else {
            continue;
        };
        let entry_length = entry.length;
        let entry_file = to_value(&mut entry.file, options)?;
        entries_value.push(json!({
            "internal_path": name,
            "length": entry_length,
            "file": entry_file,
        }));
    }

    // 4. 预览与缩略图。
    let preview_value = match file.preview.as_deref_mut() {
        Some(preview) => to_value(preview, options)?,
        None => Value::Null,
    };
    let thumbnail_value = match file.thumbnail.as_deref_mut() {
        Some(thumbnail) => to_value(thumbnail, options)?,
        None => Value::Null,
    };

    // 5. 组装属性表。
    let mut object = Map::new();
    object.insert(SERIALIZED_SOURCE_KEY.to_string(), Value::from(FILE_SOURCE));
    object.insert(
        SERIALIZED_VERSION_KEY.to_string(),
        Value::from(FORMAT_VERSION),
    );
    object.insert("id".to_string(), option_string(&file.id));
    object.insert("path".to_string(), option_string(&file.path));
    object.insert("filename".to_string(), option_string(&file.filename));
    object.insert("extension".to_string(), option_string(&file.extension));
    object.insert("save_to".to_string(), option_string(&file.save_to));
    object.insert(
        "relative_path".to_string(),
        option_string(&file.relative_path),
    );
    object.insert("length".to_string(), Value::from(file.length));
    object.insert("mime_type".to_string(), option_string(&file.mime_type));
    object.insert("file_type".to_string(), option_string(&file.file_type));
    object.insert(
        "create_date".to_string(),
        option_datetime(&file.create_date),
    );
    object.insert(
        "update_date".to_string(),
        option_datetime(&file.update_date),
    );
    object.insert("meta".to_string(), serde_json::to_value(&file.meta)?);
    object.insert("actions".to_string(), serde_json::to_value(&file.actions)?);
    object.insert("state".to_string(), serde_json::to_value(&file.state)?);
    object.insert("naming".to_string(), serde_json::to_value(&file.naming)?);
    object.insert(
        "pipelines".to_string(),
        json!({
            "extract": pipeline_value(&file.pipelines.extract)?,
            "compare": pipeline_value(&file.pipelines.compare)?,
            "hash": pipeline_value(&file.pipelines.hash)?,
            "rename": pipeline_value(&file.pipelines.rename)?,
            "render": pipeline_value(&file.pipelines.render)?,
        }),
    );
    object.insert("hashes".to_string(), Value::Object(hashes_value));
    object.insert(
        "packet".to_string(),
        json!({
            "length": unpacked_length,
            "entries": entries_value,
            "pipeline": packet_pipeline,
        }),
    );
    object.insert("preview".to_string(), preview_value);
    object.insert("thumbnail".to_string(), thumbnail_value);
    object.insert("content".to_string(), content_value);

    Ok(Value::Object(object))
}

/// [`to_value`] rendered as a JSON string.
pub fn to_json(file: &mut File, options: &SerializeOptions) -> Result<String, SerializeError> {
    let value = to_value(file, options)?;
    Ok(serde_json::to_string(&value)?)
}

/// Restores a file object from a serialized JSON value.
///
/// `storage` and `mimetyper` replace the backends the original object
/// was wired to; pipeline run state and rename ownership start fresh.
///
/// // 反序列化入口:后端重新注入,管线运行态与改名令牌全部从零开始。
pub fn from_value(
    value: &Value,
    storage: Arc<dyn Storage>,
    mimetyper: Arc<dyn MimeTyper>,
) -> Result<File, SerializeError> {
    let object = value
        .as_object()
        .ok_or(SerializeError::MalformedField { field: "root" })?;

    // 1. 来源与版本标记必须匹配。
    let source = object
        .get(SERIALIZED_SOURCE_KEY)
        .and_then(Value::as_str)
        .unwrap_or("absent");
    if source != FILE_SOURCE {
        return Err(SerializeError::UnknownSource {
            found: source.to_string(),
        });
    }
    let version = object
        .get(SERIALIZED_VERSION_KEY)
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if version != FORMAT_VERSION {
        return Err(SerializeError::UnsupportedVersion { found: version });
    }

    let mut file = File::bare(storage.clone(), mimetyper.clone());

    // 2. 标量属性。
    file.id = string_field(object, "id");
    file.path = string_field(object, "path");
    file.filename = string_field(object, "filename");
    file.extension = string_field(object, "extension");
    file.save_to = string_field(object, "save_to");
    file.relative_path = string_field(object, "relative_path");
    file.length = object.get("length").and_then(Value::as_u64).unwrap_or(0);
    file.mime_type = string_field(object, "mime_type");
    file.file_type = string_field(object, "file_type");
    file.create_date = datetime_field(object, "create_date")?;
    file.update_date = datetime_field(object, "update_date")?;

    // 3. 内容先恢复;它翻动的动作与状态随后被快照整体覆盖。
    if let Some(content) = object.get("content").filter(|value| !value.is_null()) {
        let binary = content
            .get("binary")
            .and_then(Value::as_bool)
            .ok_or(SerializeError::MalformedField { field: "content" })?;
        let encoded = content
            .get("base64")
            .and_then(Value::as_str)
            .ok_or(SerializeError::MalformedField { field: "content" })?;
        let adapter = if binary {
            BufferAdapter::binary()
        } else {
            BufferAdapter::text()
        };
        let bytes = adapter.from_base64(encoded)?;
        let source = match adapter.payload_from(bytes)? {
            Payload::Text(text) => ContentSource::Text(text),
            Payload::Binary(bytes) => ContentSource::Bytes(bytes),
        };
        file.set_content(source);
    }

    // 4. 组件账本。
    if let Some(value) = object.get("meta") {
        file.meta = serde_json::from_value(value.clone())?;
    }
    if let Some(value) = object.get("actions") {
        file.actions = serde_json::from_value(value.clone())?;
    }
    if let Some(value) = object.get("state") {
        file.state = serde_json::from_value(value.clone())?;
    }
    if let Some(value) = object.get("naming") {
        file.naming = serde_json::from_value(value.clone())?;
    }

    // 5. 管线按注册 id 重建。
    if let Some(value) = object.get("pipelines") {
        let pipelines = value
            .as_object()
            .ok_or(SerializeError::MalformedField { field: "pipelines" })?;
        if let Some(value) = pipelines.get("extract") {
            file.pipelines.extract = pipeline_from_value(value)?;
        }
        if let Some(value) = pipelines.get("compare") {
            file.pipelines.compare = pipeline_from_value(value)?;
        }
        if let Some(value) = pipelines.get("hash") {
            file.pipelines.hash = pipeline_from_value(value)?;
        }
        if let Some(value) = pipelines.get("rename") {
            file.pipelines.rename = pipeline_from_value(value)?;
        }
        if let Some(value) = pipelines.get("render") {
            file.pipelines.render = pipeline_from_value(value)?;
        }
    }

    // 6. 哈希旁车与包内条目递归重建。
    if let Some(value) = object.get("hashes") {
        let records = value
            .as_object()
            .ok_or(SerializeError::MalformedField { field: "hashes" })?;
        for (name, record) in records {
            let digest = record
                .get("digest")
                .and_then(Value::as_str)
                .ok_or(SerializeError::MalformedField { field: "hashes" })?;
            let sidecar_value = record
                .get("sidecar")
                .ok_or(SerializeError::MalformedField { field: "hashes" })?;
            let sidecar = from_value(sidecar_value, storage.clone(), mimetyper.clone())?;
            file.hashes.insert(name.clone(), digest.to_string(), sidecar);
        }
    }

    if let Some(value) = object.get("packet") {
        let packet = value
            .as_object()
            .ok_or(SerializeError::MalformedField { field: "packet" })?;
        if let Some(value) = packet.get("pipeline") {
            file.packet.pipeline = pipeline_from_value(value)?;
        }
        if let Some(entries) = packet.get("entries") {
            let entries = entries
                .as_array()
                .ok_or(SerializeError::MalformedField { field: "packet" })?;
            for entry in entries {
                let internal_path = entry
                    .get("internal_path")
                    .and_then(Value::as_str)
                    .ok_or(SerializeError::MalformedField { field: "packet" })?;
                let nested_value = entry
                    .get("file")
                    .ok_or(SerializeError::MalformedField { field: "packet" })?;
                let nested = from_value(nested_value, storage.clone(), mimetyper.clone())?;
                file.packet.insert(internal_path.to_string(), nested);
            }
        }
    }

    // 7. 预览与缩略图。
    if let Some(value) = object.get("preview").filter(|value| !value.is_null()) {
        file.preview = Some(Box::new(from_value(
            value,
            storage.clone(),
            mimetyper.clone(),
        )?));
    }
    if let Some(value) = object.get("thumbnail").filter(|value| !value.is_null()) {
        file.thumbnail = Some(Box::new(from_value(value, storage, mimetyper)?));
    }

    Ok(file)
}

/// [`from_value`] over a JSON string.
pub fn from_json(
    text: &str,
    storage: Arc<dyn Storage>,
    mimetyper: Arc<dyn MimeTyper>,
) -> Result<File, SerializeError> {
    let value: Value = serde_json::from_str(text)?;
    from_value(&value, storage, mimetyper)
}

fn option_string(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::from(text.as_str()),
        None => Value::Null,
    }
}

fn option_datetime(value: &Option<DateTime<Utc>>) -> Value {
    match value {
        Some(date) => Value::from(datetime::to_tagged(date)),
        None => Value::Null,
    }
}

fn string_field(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn datetime_field(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, SerializeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => datetime::from_tagged(text)
            .map(Some)
            .ok_or_else(|| SerializeError::BadDatetime {
                value: text.clone(),
            }),
        Some(_) => Err(SerializeError::MalformedField { field }),
    }
}

/// Pipeline as `{"processors": bindings, "current": index}`. The index
/// records how far the last run got; it is diagnostic and not restored.
fn pipeline_value(pipeline: &Pipeline) -> Result<Value, SerializeError> {
    Ok(json!({
        "processors": serde_json::to_value(pipeline.bindings())?,
        "current": pipeline.current_index(),
    }))
}

fn pipeline_from_value(value: &Value) -> Result<Pipeline, SerializeError> {
    let object = value
        .as_object()
        .ok_or(SerializeError::MalformedField { field: "pipelines" })?;
    let processors = object
        .get("processors")
        .ok_or(SerializeError::MalformedField { field: "pipelines" })?;
    let bindings: Vec<ProcessorBinding> = serde_json::from_value(processors.clone())?;
    Ok(Pipeline::new(bindings))
}
