//! Request body parsing for the post form.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use tracing::warn;

use crate::application::error::HttpError;
use crate::application::posts::{ImageUpload, PostSubmission};

const SOURCE: &str = "infra::http::forms::read_post_form";

/// Reads the multipart post form. An empty file input counts as no image.
pub async fn read_post_form(multipart: &mut Multipart) -> Result<PostSubmission, HttpError> {
    let mut submission = PostSubmission::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                warn!(
                    target: SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart field"
                );
                return Err(HttpError::new(
                    SOURCE,
                    status,
                    "Invalid form submission",
                    err.body_text(),
                ));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => submission.text = field_text(field.text().await)?,
            "group" => {
                let value = field_text(field.text().await)?;
                submission.group = Some(value).filter(|value| !value.trim().is_empty());
            }
            "image-clear" => {
                let value = field_text(field.text().await)?.to_ascii_lowercase();
                submission.clear_image = matches!(value.trim(), "on" | "true" | "1" | "yes");
            }
            "image" => {
                let filename = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default();
                let data = field.bytes().await.map_err(|err| {
                    HttpError::new(SOURCE, err.status(), "Invalid form submission", err.body_text())
                })?;
                if !filename.is_empty() || !data.is_empty() {
                    submission.image = Some(ImageUpload {
                        filename: if filename.is_empty() {
                            "image".to_string()
                        } else {
                            filename
                        },
                        data,
                    });
                }
            }
            _ => continue,
        }
    }

    Ok(submission)
}

fn field_text(
    result: Result<String, axum_extra::extract::multipart::MultipartError>,
) -> Result<String, HttpError> {
    result.map_err(|err| {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            HttpError::new(SOURCE, status, "Upload too large", err.body_text())
        } else {
            HttpError::new(SOURCE, status, "Invalid form submission", err.body_text())
        }
    })
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::FromRequest, http::Request};

    use super::*;

    const BOUNDARY: &str = "form-boundary";

    async fn multipart(body: String) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .uri("/create/")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        Multipart::from_request(request, &()).await.expect("multipart")
    }

    fn part(name: &str, value: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
    }

    fn file_part(filename: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{value}\r\n"
        )
    }

    #[tokio::test]
    async fn reads_text_group_and_clear_flag() {
        let body = [
            part("text", "Hello"),
            part("group", "3"),
            part("image-clear", "on"),
            part("csrfmiddlewaretoken", "ignored"),
            format!("--{BOUNDARY}--\r\n"),
        ]
        .concat();
        let submission = read_post_form(&mut multipart(body).await).await.unwrap();

        assert_eq!(submission.text, "Hello");
        assert_eq!(submission.group.as_deref(), Some("3"));
        assert!(submission.clear_image);
        assert!(submission.image.is_none());
    }

    #[tokio::test]
    async fn empty_group_and_empty_file_mean_none() {
        let body = [
            part("text", "Hello"),
            part("group", ""),
            file_part("", ""),
            format!("--{BOUNDARY}--\r\n"),
        ]
        .concat();
        let submission = read_post_form(&mut multipart(body).await).await.unwrap();

        assert_eq!(submission.group, None);
        assert!(submission.image.is_none());
        assert!(!submission.clear_image);
    }

    #[tokio::test]
    async fn keeps_uploaded_file_name_and_bytes() {
        let body = [
            part("text", "Hello"),
            file_part("cat.gif", "GIF89a"),
            format!("--{BOUNDARY}--\r\n"),
        ]
        .concat();
        let submission = read_post_form(&mut multipart(body).await).await.unwrap();

        let image = submission.image.expect("image");
        assert_eq!(image.filename, "cat.gif");
        assert_eq!(image.data.as_ref(), b"GIF89a");
    }
}
