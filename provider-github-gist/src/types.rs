//! GitHub Gist API request and response types
//!
//! See: https://docs.github.com/en/rest/gists/gists

use bridge_traits::storage::{RemoteBlob, RemoteBlobFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authenticated user (`GET /user`)
#[derive(Debug, Clone, Deserialize)]
pub struct GistUser {
    pub login: String,
}

/// File entry inside a gist
///
/// `content` is only present on single-gist responses and is cut off at
/// roughly one megabyte, in which case `truncated` is set and the full text
/// must be read from `raw_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct GistFile {
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub truncated: bool,
    pub raw_url: Option<String>,
    pub size: Option<u64>,
}

/// Gist resource
#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    pub id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub public: bool,
}

impl From<Gist> for RemoteBlob {
    fn from(gist: Gist) -> Self {
        let files = gist
            .files
            .into_iter()
            .map(|(key, file)| RemoteBlobFile {
                name: file.filename.unwrap_or(key),
                content: file.content,
                truncated: file.truncated,
                raw_url: file.raw_url,
                size: file.size,
            })
            .collect();

        RemoteBlob {
            id: gist.id,
            description: gist.description,
            files,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GistFileContent<'a> {
    pub content: &'a str,
}

/// `POST /gists` body
#[derive(Debug, Serialize)]
pub struct CreateGistRequest<'a> {
    pub description: &'a str,
    pub public: bool,
    pub files: BTreeMap<&'a str, GistFileContent<'a>>,
}

/// `PATCH /gists/{id}` body
#[derive(Debug, Serialize)]
pub struct UpdateGistRequest<'a> {
    pub files: BTreeMap<&'a str, GistFileContent<'a>>,
}

pub fn single_file<'a>(name: &'a str, content: &'a str) -> BTreeMap<&'a str, GistFileContent<'a>> {
    let mut files = BTreeMap::new();
    files.insert(name, GistFileContent { content });
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gist_into_remote_blob() {
        let json = r#"{
            "id": "aa5a315d61ae9438b18d",
            "description": "Image Catalog Backup",
            "public": false,
            "files": {
                "image-catalog.json": {
                    "filename": "image-catalog.json",
                    "size": 2048,
                    "raw_url": "https://gist.githubusercontent.com/raw/image-catalog.json",
                    "truncated": true,
                    "content": "[{\"id\""
                }
            }
        }"#;
        let gist: Gist = serde_json::from_str(json).unwrap();
        let blob = RemoteBlob::from(gist);

        assert_eq!(blob.id, "aa5a315d61ae9438b18d");
        let file = blob.file("image-catalog.json").unwrap();
        assert!(file.truncated);
        assert_eq!(file.size, Some(2048));
        assert!(file.raw_url.is_some());
    }

    #[test]
    fn test_list_entries_without_content() {
        let json = r#"[{"id":"1","description":null,"files":{"a.txt":{"filename":"a.txt","raw_url":"https://x/a.txt","size":3}}}]"#;
        let gists: Vec<Gist> = serde_json::from_str(json).unwrap();
        let blob = RemoteBlob::from(gists[0].clone());

        assert_eq!(blob.description, None);
        assert_eq!(blob.files[0].content, None);
        assert!(!blob.files[0].truncated);
    }

    #[test]
    fn test_create_request_shape() {
        let request = CreateGistRequest {
            description: "Image Catalog Backup",
            public: false,
            files: single_file("image-catalog.json", "[]"),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["public"], false);
        assert_eq!(value["files"]["image-catalog.json"]["content"], "[]");
    }
}
