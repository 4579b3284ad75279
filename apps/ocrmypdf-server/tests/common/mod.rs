//! Shared fixtures for the HTTP tests: fake toolchain scripts, generated
//! PDFs, multipart bodies and a router wired to a scratch work directory.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;
use tower::ServiceExt;

use ocrmypdf_server::config::Config;
use ocrmypdf_server::state::AppState;

/// Copies input to output and appends the received arguments as a PDF comment
const OCRMYPDF_OK: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "16.4.2"
    exit 0
fi
for arg in "$@"; do
    input="$output"
    output="$arg"
done
cp "$input" "$output"
echo "%ocrmypdf-args: $*" >> "$output"
"#;

const OCRMYPDF_PRIOR_TEXT: &str = r#"#!/bin/sh
echo "PriorOcrFoundError: page already has text! - aborting (use --force-ocr to force OCR)" >&2
exit 6
"#;

const OCRMYPDF_FAIL: &str = r#"#!/bin/sh
echo "InputFileError: bad xref table" >&2
exit 2
"#;

const OCRMYPDF_HANG: &str = r#"#!/bin/sh
sleep 30
"#;

/// Leaves a grandchild running and records its pid next to the script
const OCRMYPDF_SPAWNS_CHILD: &str = r#"#!/bin/sh
sleep 60 &
echo $! > "$0.pid"
wait
"#;

const TESSERACT: &str = r#"#!/bin/sh
echo "tesseract 5.3.0"
echo " leptonica-1.82.0"
"#;

/// Path that never resolves; any spawn attempt fails with a 500
pub const MISSING_TOOL: &str = "/nonexistent/ocrmypdf";

fn tools_dir() -> &'static Path {
    static TOOLS: OnceLock<TempDir> = OnceLock::new();

    // Every script is written before any test can spawn a process, so no
    // child inherits a script that is still open for writing.
    TOOLS
        .get_or_init(|| {
            let dir = TempDir::new().unwrap();
            for (name, body) in [
                ("ocrmypdf-ok", OCRMYPDF_OK),
                ("ocrmypdf-prior-text", OCRMYPDF_PRIOR_TEXT),
                ("ocrmypdf-fail", OCRMYPDF_FAIL),
                ("ocrmypdf-hang", OCRMYPDF_HANG),
                ("ocrmypdf-spawns-child", OCRMYPDF_SPAWNS_CHILD),
                ("tesseract", TESSERACT),
            ] {
                let path = dir.path().join(name);
                std::fs::write(&path, body).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
            dir
        })
        .path()
}

/// Path to one of the fake tools
pub fn tool(name: &str) -> String {
    tools_dir().join(name).display().to_string()
}

/// Pid recorded by `ocrmypdf-spawns-child`, once it has been written
pub fn recorded_child_pid() -> Option<i32> {
    let path = format!("{}.pid", tool("ocrmypdf-spawns-child"));
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// True while `pid` exists and is not a zombie
#[cfg(target_os = "linux")]
pub fn process_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // State is the first field after the parenthesised command name
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// A router backed by the given ocrmypdf stand-in and a private work dir
pub struct TestApp {
    pub router: Router,
    pub work_dir: TempDir,
}

impl TestApp {
    pub fn new(ocrmypdf_path: &str) -> Self {
        Self::with_config(ocrmypdf_path, |_| {})
    }

    pub fn with_config(ocrmypdf_path: &str, customize: impl FnOnce(&mut Config)) -> Self {
        let tesseract_path = tool("tesseract");
        let work_dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.ocr.ocrmypdf_path = ocrmypdf_path.to_string();
        config.ocr.tesseract_path = tesseract_path;
        config.ocr.work_dir = Some(work_dir.path().to_path_buf());
        customize(&mut config);

        Self {
            router: ocrmypdf_server::app(AppState::new(config)),
            work_dir,
        }
    }

    /// Job workspaces still present in the work dir
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name).unwrap().to_str().unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal multipart/form-data builder
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----ocrmypdf-server-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                self.boundary, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Build a PDF with `pages` pages, each carrying a line of text
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let kids: Vec<Object> = (0..pages)
        .map(|n| {
            let content = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", n + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Multipart request for POST /ocr/ with the given PDF and text fields
pub fn ocr_request(pdf: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    fields
        .iter()
        .fold(MultipartBody::new(), |body, (name, value)| body.text(name, value))
        .file("pdf_file", "scan.pdf", pdf)
        .into_request("/ocr/")
}
