// ==========================================
// 数据源 → 导入 集成测试
// ==========================================
// 测试目标: CSV / JSON 文件经 ImportRunner 写入目标表
// ==========================================


use entity_import::domain::{FieldMappingRule, FieldValue, ImportConfig, ImportMode};
use entity_import::importer::{
    source_from_location, source_from_path, CsvSource, ImportError, ImportRunner, JsonSource,
    RunStatus, Source, TableSource,
};
use entity_import::repository::EntityStore;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use test_helpers::{all_members, member_config, memory_store};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// 本地 HTTP 服务：对前 n 个请求返回固定响应，返回基础地址
fn serve(status_line: &'static str, body: &'static str, requests: usize) -> String {
    // 本地地址不走代理
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    std::env::set_var("no_proxy", "127.0.0.1,localhost");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let mut stream = stream.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!(
                "{}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });
    format!("http://{}", addr)
}

#[test]
fn test_csv_file_import() {
    let store = memory_store();
    let source = source_from_path(fixture("members.csv")).unwrap();

    let summary = ImportRunner::new(&store)
        .run(&member_config(ImportMode::Insert), source.as_ref(), false)
        .into_result()
        .unwrap();

    // 空白行被跳过
    assert_eq!(summary.total_count, 3);
    let rows = all_members(&store);
    assert_eq!(rows[2].get("firstname"), Some(&FieldValue::from("Cid")));
}

#[test]
fn test_csv_without_header_uses_positions() {
    let store = memory_store();
    let source = CsvSource::from_path(fixture("members_semicolon.csv"))
        .with_delimiter(b';')
        .with_header_row(false);

    assert_eq!(source.heading_line().unwrap(), vec!["0", "1", "2"]);

    let mut config = ImportConfig::new("tl_member", ImportMode::Insert);
    config.field_mapping = vec![
        FieldMappingRule::source("email", "0"),
        FieldMappingRule::source("firstname", "1"),
    ];

    let summary = ImportRunner::new(&store)
        .run(&config, &source, false)
        .into_result()
        .unwrap();
    assert_eq!(summary.total_count, 2);
    assert_eq!(
        all_members(&store)[1].get("email"),
        Some(&FieldValue::from("b@example.com"))
    );
}

#[test]
fn test_csv_field_options() {
    let source = CsvSource::from_path(fixture("members.csv"));
    let options = source.field_options().unwrap();
    assert_eq!(options[0], ("mail".to_string(), "mail [0]".to_string()));
    assert_eq!(source.preview_lines(2).unwrap(), "mail,first,last\na@example.com,Ann,Arp");
}

#[test]
fn test_json_file_with_stored_config() {
    let store = memory_store();
    let config = ImportConfig::from_json_file(fixture("member_config.json")).unwrap();
    assert_eq!(config.import_mode, ImportMode::Merge);

    let source = JsonSource::from_path(fixture("members.json")).with_data_path("data.items");
    assert!(source.name().starts_with("json:"));

    let summary = ImportRunner::new(&store)
        .run(&config, &source, false)
        .into_result()
        .unwrap();
    assert_eq!(summary.status, RunStatus::Success);
    assert_eq!(summary.inserted, 2);

    let rows = all_members(&store);
    assert_eq!(rows[0].get("email"), Some(&FieldValue::from("a@example.com")));
    assert_eq!(rows[0].get("login"), Some(&FieldValue::Integer(1)));
    assert_eq!(rows[1].get("login"), Some(&FieldValue::Integer(0)));
    assert_eq!(rows[1].get("sorting"), Some(&FieldValue::Integer(256)));

    // 再次导入: 全部命中合并
    let summary = ImportRunner::new(&store)
        .run(&config, &source, false)
        .into_result()
        .unwrap();
    assert_eq!((summary.inserted, summary.updated), (0, 2));
    assert_eq!(all_members(&store).len(), 2);
}

#[test]
fn test_source_errors_abort_run() {
    let store = memory_store();

    // 未指定数据路径时顶层对象不是数组
    let source = source_from_path(fixture("members.json")).unwrap();
    let result =
        ImportRunner::new(&store).run(&member_config(ImportMode::Insert), source.as_ref(), false);
    assert!(matches!(result.error(), Some(ImportError::JsonParseError(_))));
    assert_eq!(result.summary().total_count, 0);

    assert!(matches!(
        source_from_path(fixture("missing.csv")),
        Err(ImportError::FileNotFound(_))
    ));
    assert!(matches!(
        source_from_path(fixture("members.txt")),
        Err(ImportError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_csv_over_http_import() {
    let base = serve(
        "HTTP/1.1 200 OK",
        "mail,first,last\na@example.com,Ann,Arp\nb@example.com,Ben,Bay\n",
        1,
    );
    let store = memory_store();
    let source = source_from_location(&format!("{}/export/members.csv?token=abc", base)).unwrap();
    assert!(source.name().starts_with("csv:http://127.0.0.1:"));

    let summary = ImportRunner::new(&store)
        .run(&member_config(ImportMode::Insert), source.as_ref(), false)
        .into_result()
        .unwrap();
    assert_eq!(summary.inserted, 2);
    assert_eq!(
        all_members(&store)[1].get("email"),
        Some(&FieldValue::from("b@example.com"))
    );
}

#[test]
fn test_http_error_status_aborts_run() {
    let base = serve("HTTP/1.1 404 Not Found", "missing", 1);
    let store = memory_store();
    let source = JsonSource::from_url(format!("{}/feed.json", base));

    let result = ImportRunner::new(&store).run(&member_config(ImportMode::Insert), &source, false);
    assert!(matches!(result.error(), Some(ImportError::HttpError(_))));
    assert!(all_members(&store).is_empty());
}

#[test]
fn test_table_source_copies_rows() {
    let store = memory_store();
    store
        .connection()
        .lock()
        .unwrap()
        .execute_batch(
            "CREATE TABLE tl_legacy_member (id INTEGER PRIMARY KEY, mail TEXT, first TEXT, last TEXT);
             INSERT INTO tl_legacy_member (mail, first, last) VALUES
                 ('a@example.com', 'Ann', 'Arp'),
                 ('b@example.com', 'Ben', 'Bay');",
        )
        .unwrap();

    let source = TableSource::new(&store, "tl_legacy_member");
    let summary = ImportRunner::new(&store)
        .run(&member_config(ImportMode::Insert), &source, false)
        .into_result()
        .unwrap();

    assert_eq!(summary.inserted, 2);
    let rows = all_members(&store);
    assert_eq!(rows[0].get("firstname"), Some(&FieldValue::from("Ann")));
    assert_eq!(store.find_many("tl_legacy_member", &Default::default()).unwrap().len(), 2);
}
