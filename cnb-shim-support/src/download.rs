use crate::redact::redact_credentials;
use std::path::Path;
use std::time::Duration;
use std::{fs, io};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("Could not download {url}: server responded with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Could not download {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("I/O error while downloading {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: io::Error,
    },
}

/// Downloads a file via HTTP(S) to a local path, creating missing parent directories.
///
/// Any response outside of the 2xx range is an error. The destination file is only created once
/// the server accepted the request and is removed again if the transfer fails midway. URLs in
/// errors have their credentials redacted.
pub fn download_file(url: &str, destination: impl AsRef<Path>) -> Result<(), DownloadError> {
    let destination = destination.as_ref();
    let io_error = |source| DownloadError::Io {
        url: redact_credentials(url),
        source,
    };

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .build();

    let response = match agent.get(url).call() {
        Ok(response) if (200..300).contains(&response.status()) => response,
        Ok(response) => {
            return Err(DownloadError::HttpStatus {
                url: redact_credentials(url),
                status: response.status(),
            });
        }
        Err(ureq::Error::Status(status, _)) => {
            return Err(DownloadError::HttpStatus {
                url: redact_credentials(url),
                status,
            });
        }
        // The transport error is flattened since its `Display` includes the unredacted URL.
        Err(ureq::Error::Transport(transport)) => {
            return Err(DownloadError::Transport {
                url: redact_credentials(url),
                reason: transport.message().map_or_else(
                    || transport.kind().to_string(),
                    |message| format!("{}: {message}", transport.kind()),
                ),
            });
        }
    };

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut file = fs::File::create(destination).map_err(io_error)?;
    if let Err(error) = io::copy(&mut response.into_reader(), &mut file) {
        drop(file);
        let _ = fs::remove_file(destination);
        return Err(io_error(error));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn start_server(status: u16, body: &'static str) -> (tokio::runtime::Runtime, MockServer) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/thing.tgz"))
                .respond_with(ResponseTemplate::new(status).set_body_string(body))
                .mount(&server)
                .await;
            server
        });

        (runtime, server)
    }

    #[test]
    fn writes_the_response_body_into_missing_directories() {
        let (_runtime, server) = start_server(200, "archive contents");
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("nested").join("thing.tgz");

        download_file(&format!("{}/thing.tgz", server.uri()), &destination).unwrap();

        assert_eq!(
            fs::read_to_string(&destination).unwrap(),
            "archive contents"
        );
    }

    #[test]
    fn non_success_status_leaves_no_file_behind() {
        let (_runtime, server) = start_server(404, "not here");
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("thing.tgz");

        let error = download_file(&format!("{}/thing.tgz", server.uri()), &destination).unwrap_err();

        assert!(matches!(
            error,
            DownloadError::HttpStatus { status: 404, .. }
        ));
        assert!(!destination.exists());
    }

    #[test]
    fn credentials_do_not_appear_in_errors() {
        let (_runtime, server) = start_server(500, "");
        let temp_dir = tempfile::tempdir().unwrap();
        let url = server
            .uri()
            .replacen("http://", "http://user:secret@", 1);

        let error = download_file(&format!("{url}/thing.tgz"), temp_dir.path().join("thing.tgz"))
            .unwrap_err();

        assert!(!error.to_string().contains("secret"));
        assert!(error.to_string().contains("-redacted-"));
    }
}
