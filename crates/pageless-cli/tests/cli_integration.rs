use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use tempfile::{tempdir, TempDir};

fn pageless() -> Command {
    let mut cmd = Command::cargo_bin("pageless").unwrap();
    cmd.env_remove("PAGELESS_CONFIG")
        .env_remove("PAGELESS_DEBUG_LOG")
        .env("XDG_CONFIG_HOME", "/nonexistent/pageless-test-config");
    cmd
}

fn parse_json_output(output: &[u8]) -> Value {
    serde_json::from_str(&String::from_utf8_lossy(output)).expect("Failed to parse JSON output")
}

/// A config file with no debounce so simulations finish immediately.
fn fast_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, "debounce_ms = 0\n").unwrap();
    path
}

fn run_success(args: &[&str]) -> Value {
    let output = pageless()
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = parse_json_output(&output);
    assert!(json["success"].as_bool().unwrap());
    json
}

mod plan_tests {
    use super::*;

    #[test]
    fn test_plan_at_top_loads_head() {
        let json = run_success(&["plan", "--count", "1000"]);

        assert_eq!(json["data"]["count"], 1);
        let step = &json["data"]["items"][0];
        assert_eq!(step["scroll_top"], 0.0);
        assert_eq!(step["plans"][0]["strategy"], "head");
        assert_eq!(step["plans"][0]["start"], 0);
        assert_eq!(step["plans"][0]["count"], 40);
    }

    #[test]
    fn test_plan_inside_gap_loads_middle() {
        let json = run_success(&["plan", "--count", "1000", "--scroll", "905"]);

        let plan = &json["data"]["items"][0]["plans"][0];
        assert_eq!(plan["strategy"], "middle");
        assert_eq!(plan["start"], 41);
        assert_eq!(plan["count"], 40);
        assert_eq!(plan["expected"], json!({"start": 0, "end": 1000}));
    }

    #[test]
    fn test_plan_clamps_scroll_and_loads_tail() {
        let json = run_success(&["plan", "--count", "1000", "--scroll", "5000000"]);

        let step = &json["data"]["items"][0];
        assert_eq!(step["scroll_top"], 19600.0);
        assert_eq!(step["plans"][0]["strategy"], "tail");
        assert_eq!(step["plans"][0]["start"], 960);
    }

    #[test]
    fn test_plan_every_scroll_position() {
        let json = run_success(&[
            "plan", "--count", "1000", "--scroll", "0", "--scroll", "905", "--scroll", "19600",
        ]);

        let strategies: Vec<&str> = json["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|step| step["plans"][0]["strategy"].as_str().unwrap())
            .collect();
        assert_eq!(strategies, vec!["head", "middle", "tail"]);
    }

    #[test]
    fn test_plan_honours_item_size_and_viewport() {
        let json = run_success(&[
            "plan",
            "--count",
            "500",
            "--item-size",
            "10",
            "--viewport-height",
            "100",
        ]);

        assert_eq!(json["data"]["items"][0]["plans"][0]["count"], 20);
    }

    #[test]
    fn test_plan_empty_dataset() {
        let json = run_success(&["plan", "--count", "0"]);

        assert_eq!(json["data"]["items"][0]["plans"], json!([]));
    }

    #[test]
    fn test_plan_rejects_invalid_item_size() {
        pageless()
            .args(["plan", "--count", "10", "--item-size", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"success\":false"))
            .stderr(predicate::str::contains("item_size"));
    }
}

mod simulate_tests {
    use super::*;

    #[test]
    fn test_simulate_mount_loads_first_page() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "1000",
        ]);

        let data = &json["data"];
        assert_eq!(data["page_size"], 40);
        assert_eq!(data["fetches"], 1);
        assert_eq!(data["content_height"], 20000.0);

        let mount = &data["steps"][0];
        assert_eq!(mount["plans"][0]["strategy"], "head");
        assert_eq!(
            mount["event"],
            json!({
                "kind": "loaded",
                "range": {"start": 0, "end": 40},
                "strategy": "head",
                "received": 40
            })
        );
        assert_eq!(mount["state"]["gaps"], json!([{"start": 40, "end": 1000}]));
        assert_eq!(mount["state"]["unloaded_items"], 960);
        assert_eq!(mount["state"]["pending"], false);
    }

    #[test]
    fn test_simulate_scroll_sequence() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "1000",
            "--scroll",
            "905",
            "--scroll",
            "19600",
        ]);

        let steps = json["data"]["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 3);

        assert_eq!(steps[1]["scroll_top"], 905.0);
        assert_eq!(steps[1]["event"]["strategy"], "head");
        assert_eq!(steps[1]["event"]["range"], json!({"start": 40, "end": 80}));

        assert_eq!(steps[2]["event"]["strategy"], "tail");
        assert_eq!(steps[2]["event"]["range"], json!({"start": 960, "end": 1000}));
        assert_eq!(steps[2]["state"]["gaps"], json!([{"start": 80, "end": 960}]));
        assert_eq!(
            steps[2]["state"]["loaded"],
            json!([{"start": 0, "end": 80}, {"start": 960, "end": 1000}])
        );
        assert_eq!(json["data"]["fetches"], 3);
        assert_eq!(json["data"]["content_height"], 20000.0);
    }

    #[test]
    fn test_simulate_scroll_without_new_gap_does_nothing() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "1000",
            "--margin",
            "0",
            "--scroll",
            "100",
        ]);

        let step = &json["data"]["steps"][1];
        assert_eq!(step["plans"], json!([]));
        assert!(step.get("event").is_none());
        assert_eq!(json["data"]["fetches"], 1);
    }

    #[test]
    fn test_simulate_debounce_flag_overrides_config() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "debounce_ms = 60000\nitem_size = 10.0\n").unwrap();

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "100",
            "--debounce-ms",
            "0",
        ]);

        assert_eq!(json["data"]["item_size"], 10.0);
        assert_eq!(json["data"]["page_size"], 80);
        assert_eq!(json["data"]["steps"][0]["event"]["range"]["end"], 80);
    }

    #[test]
    fn test_simulate_config_from_env() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);

        let output = pageless()
            .env("PAGELESS_CONFIG", &config)
            .args(["simulate", "--count", "30"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let json = parse_json_output(&output);
        assert_eq!(json["data"]["steps"][0]["state"]["gaps"], json!([]));
    }

    #[test]
    fn test_simulate_empty_dataset() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "0",
        ]);

        assert_eq!(json["data"]["fetches"], 0);
        assert!(json["data"]["steps"][0].get("event").is_none());
    }

    #[test]
    fn test_simulate_missing_config_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        pageless()
            .args([
                "--config",
                missing.to_str().unwrap(),
                "simulate",
                "--count",
                "10",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"success\":false"));
    }

    #[test]
    fn test_simulate_invalid_config_file() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "start_param_name = \"x\"\ncount_param_name = \"x\"\n").unwrap();

        pageless()
            .args(["--config", config.to_str().unwrap(), "simulate", "--count", "10"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("share the name"));
    }
}

mod endpoint_tests {
    use super::*;

    /// Answer one range request with `<li>` items for the requested indices
    /// and hand back the request line.
    fn serve_range_once() -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }

            let query = request_line
                .split_whitespace()
                .nth(1)
                .and_then(|target| target.split_once('?'))
                .map(|(_, query)| query.to_string())
                .unwrap_or_default();
            let param = |name: &str| -> usize {
                let prefix = format!("{}=", name);
                query
                    .split('&')
                    .find_map(|pair| pair.strip_prefix(prefix.as_str()))
                    .unwrap()
                    .parse()
                    .unwrap()
            };
            let (start, count) = (param("start"), param("count"));

            let body: String = (start..start + count)
                .map(|i| format!("<li>{}</li>\n", i))
                .collect();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .unwrap();
            request_line.trim_end().to_string()
        });

        (base, handle)
    }

    #[test]
    fn test_simulate_against_http_endpoint() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);
        let (base, server) = serve_range_once();

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "30",
            "--endpoint",
            base.as_str(),
        ]);

        let mount = &json["data"]["steps"][0];
        assert_eq!(mount["event"]["kind"], "loaded");
        assert_eq!(mount["event"]["range"], json!({"start": 0, "end": 30}));
        assert_eq!(mount["event"]["received"], 30);
        assert_eq!(mount["state"]["gaps"], json!([]));
        assert!(json["data"].get("fetches").is_none());

        assert_eq!(server.join().unwrap(), "GET /data?start=0&count=30 HTTP/1.1");
    }

    #[test]
    fn test_unreachable_endpoint_reports_failed_load() {
        let dir = tempdir().unwrap();
        let config = fast_config(&dir);
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let json = run_success(&[
            "--config",
            config.to_str().unwrap(),
            "simulate",
            "--count",
            "30",
            "--endpoint",
            base.as_str(),
        ]);

        let mount = &json["data"]["steps"][0];
        assert_eq!(mount["event"]["kind"], "failed");
        assert_eq!(mount["state"]["gaps"], json!([{"start": 0, "end": 30}]));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        pageless()
            .args(["simulate", "--count", "30", "--endpoint", "not a url"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid base URL"));
    }
}

#[cfg(target_os = "linux")]
mod user_config_tests {
    use super::*;

    fn user_config(dir: &TempDir, content: &str) {
        let config_dir = dir.path().join("pageless");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_user_config_is_applied() {
        let dir = tempdir().unwrap();
        user_config(&dir, "item_size = 10.0\n");

        let output = pageless()
            .env("XDG_CONFIG_HOME", dir.path())
            .args(["plan", "--count", "1000"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let json = parse_json_output(&output);
        assert_eq!(json["data"]["items"][0]["plans"][0]["count"], 80);
    }

    #[test]
    fn test_invalid_user_config_fails() {
        let dir = tempdir().unwrap();
        user_config(&dir, "item_size = -1.0\n");

        pageless()
            .env("XDG_CONFIG_HOME", dir.path())
            .args(["plan", "--count", "1000"])
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("\"success\":false"))
            .stderr(predicate::str::contains("item_size must be a positive number"));
    }

    #[test]
    fn test_malformed_user_config_fails() {
        let dir = tempdir().unwrap();
        user_config(&dir, "item_size = [\n");

        pageless()
            .env("XDG_CONFIG_HOME", dir.path())
            .args(["plan", "--count", "1000"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Serialization error"));
    }
}

mod completions_tests {
    use super::*;

    #[test]
    fn test_bash_completions() {
        pageless()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pageless"));
    }
}
