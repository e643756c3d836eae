
use crate::config::CrawlConfig;
use std::sync::mpsc;
use std::thread;
use tempfile::TempDir;

/// Config writing into a fresh temporary output directory
fn temp_config(start_url: &str) -> (CrawlConfig, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut config = CrawlConfig::new(start_url);
    config.out_dir = dir.path().to_path_buf();
    config.timeout_secs = 5;
    crate::prepare_output(&config).expect("create output dirs");
    (config, dir)
}

/// Serves a single response on a local port and returns its URL
fn serve_once(status: u16, body: String) -> (String, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let addr = server.server_addr();
    let (ready_tx, ready_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        let _ = ready_tx.send(());
        if let Ok(request) = server.recv() {
            let _ = request.respond(tiny_http::Response::from_string(body).with_status_code(status));
        }
    });
    ready_rx.recv().expect("server thread started");
    (format!("http://{addr}/sitemap.xml"), handle)
}

fn urlset(urls: &[&str]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{u}</loc></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
    )
}
