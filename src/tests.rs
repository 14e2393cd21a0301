pub(crate) mod support {
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use zip::write::FileOptions;

    type Routes = Arc<Mutex<HashMap<String, Vec<u8>>>>;

    /// Minimal HTTP/1.1 responder serving canned bodies from memory.
    pub struct TestServer {
        addr: SocketAddr,
        routes: Routes,
        hits: Arc<AtomicUsize>,
    }

    impl TestServer {
        pub fn start(routes: Vec<(&str, Vec<u8>)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
            let addr = listener.local_addr().expect("Failed to read local addr");
            let routes: Routes = Arc::new(Mutex::new(
                routes
                    .into_iter()
                    .map(|(path, body)| (path.to_string(), body))
                    .collect(),
            ));
            let hits = Arc::new(AtomicUsize::new(0));

            let thread_routes = Arc::clone(&routes);
            let thread_hits = Arc::clone(&hits);
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    thread_hits.fetch_add(1, Ordering::SeqCst);
                    let _ = respond(stream, &thread_routes);
                }
            });

            Self { addr, routes, hits }
        }

        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        pub fn route(&self, path: &str, body: Vec<u8>) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), body);
        }

        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    fn respond(stream: TcpStream, routes: &Routes) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header)? == 0 || header == "\r\n" {
                break;
            }
        }

        let path = request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or("/")
            .to_string();
        let body = routes.lock().unwrap().get(&path).cloned();

        let mut stream = stream;
        match body {
            Some(body) => {
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )?;
                stream.write_all(&body)?;
            }
            None => {
                write!(
                    stream,
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                )?;
            }
        }
        stream.flush()
    }

    /// Build a zip whose entries all live under `wrapper/`. Names ending in
    /// `/` become directories.
    pub fn skeleton_zip(wrapper: &str, entries: &[(&str, &str)]) -> Vec<u8> {
        let prefixed: Vec<(String, &str)> = entries
            .iter()
            .map(|(name, content)| (format!("{}/{}", wrapper, name), *content))
            .collect();

        let mut all = vec![(format!("{}/", wrapper), "")];
        all.extend(prefixed);
        let refs: Vec<(&str, &str)> = all.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        raw_zip(&refs)
    }

    /// Build a zip with exactly the given entry names.
    pub fn raw_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(name.trim_end_matches('/'), options)
                    .unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }

        writer.finish().unwrap().into_inner()
    }
}

use crate::config;
use crate::types::{InstallOptions, OctoConfig, ReleaseChannel};
use std::path::PathBuf;

#[test]
fn test_normalize_key() {
    assert_eq!(config::normalize_key("stable-url"), "stable_url");
    assert_eq!(config::normalize_key("phpBinary"), "php_binary");
    assert_eq!(config::normalize_key("http-timeout-secs"), "http_timeout_secs");
}

#[test]
fn test_config_default() {
    let config = OctoConfig::default();
    assert_eq!(
        config.settings.stable_url,
        "https://github.com/rueduphp/skeleton/archive/master.zip"
    );
    assert_eq!(config.settings.wrapper_dir, "skeleton-master");
    assert_eq!(config.settings.http_timeout_secs, 300);
    assert_eq!(config.settings.php_binary, "php");
}

#[test]
fn test_config_tolerates_partial_file() {
    let config: OctoConfig =
        serde_json::from_str(r#"{"settings": {"wrapper_dir": "skeleton-develop"}}"#).unwrap();
    assert_eq!(config.settings.wrapper_dir, "skeleton-develop");
    assert_eq!(config.settings.php_binary, "php");

    let config: OctoConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, OctoConfig::default());
}

#[test]
fn test_release_channel_from_flag() {
    assert_eq!(ReleaseChannel::from_dev_flag(false), ReleaseChannel::Stable);
    assert_eq!(ReleaseChannel::from_dev_flag(true), ReleaseChannel::Dev);
    assert_eq!(ReleaseChannel::Dev.to_string(), "dev");
}

#[test]
fn test_install_options_target() {
    let cwd = PathBuf::from("/work");
    let options = InstallOptions::new(
        cwd.clone(),
        Some("demo"),
        ReleaseChannel::Stable,
        Default::default(),
    );
    assert_eq!(options.target_dir, PathBuf::from("/work/demo"));
    assert!(options.allow_tty);

    let options = InstallOptions::new(cwd.clone(), None, ReleaseChannel::Dev, Default::default())
        .with_tty(false);
    assert_eq!(options.target_dir, cwd);
    assert!(!options.allow_tty);
}
