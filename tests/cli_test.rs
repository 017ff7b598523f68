//! CLI Command Tests
//!
//! Argument parsing, text rendering and command handlers against mocked
//! receivers. Covers exit codes and input validation.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use eha::cli::{Cli, Command, MessageKind, NamespaceFilter, ServiceSort};
    use eha::models::PowerState;

    #[test]
    fn test_epg_search_alias() {
        let cli = Cli::parse_from(["eha", "s", "tatort", "-t"]);
        match cli.command {
            Command::EpgSearch(cmd) => {
                assert_eq!(cmd.query, "tatort");
                assert!(cmd.technical);
                assert!(cmd.blacklist.is_none());
            }
            _ => panic!("Expected EpgSearch command"),
        }
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::parse_from(["eha", "timer-list", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::TimerList(_)));
    }

    #[test]
    fn test_service_list_options() {
        let cli = Cli::parse_from([
            "eha",
            "sl",
            "--sort",
            "sref",
            "--ns",
            "dvb-s",
            "--oid",
            "0x85",
            "--oid",
            "1",
        ]);
        match cli.command {
            Command::ServiceList(cmd) => {
                assert_eq!(cmd.sort, ServiceSort::Sref);
                assert_eq!(cmd.ns, vec![NamespaceFilter::DvbS]);
                assert_eq!(cmd.oid, vec![0x85, 1]);
            }
            _ => panic!("Expected ServiceList command"),
        }
    }

    #[test]
    fn test_zap_with_namespace() {
        let cli = Cli::parse_from(["eha", "zap", "Sky Atlantic HD", "--ns", "dvb-c"]);
        match cli.command {
            Command::Zap(cmd) => {
                assert_eq!(cmd.service, "Sky Atlantic HD");
                assert_eq!(cmd.ns, Some(NamespaceFilter::DvbC));
            }
            _ => panic!("Expected Zap command"),
        }
    }

    #[test]
    fn test_power_by_code() {
        let cli = Cli::parse_from(["eha", "power", "5"]);
        match cli.command {
            Command::Power(cmd) => assert_eq!(cmd.state, PowerState::Standby),
            _ => panic!("Expected Power command"),
        }
    }

    #[test]
    fn test_message_answer_conflicts_with_type() {
        assert!(Cli::try_parse_from(["eha", "msg", "hi", "--answer", "--type", "attention"]).is_err());

        let cli = Cli::parse_from(["eha", "msg", "hi", "--type", "attention", "-t", "0"]);
        match cli.command {
            Command::Message(cmd) => {
                assert_eq!(cmd.message_type, MessageKind::Attention);
                assert_eq!(cmd.timeout, 0);
                assert!(!cmd.answer);
            }
            _ => panic!("Expected Message command"),
        }
    }

    #[test]
    fn test_invalid_power_state_rejected() {
        assert!(Cli::try_parse_from(["eha", "power", "nap"]).is_err());
    }
}

// =============================================================================
// Rendering Tests
// =============================================================================

mod rendering {
    use eha::commands::{render_event, render_service, timer_delete_url, EventOutput};
    use eha::event::Event;
    use eha::services::ServiceFilter;
    use eha::services::ServiceEntry;
    use serde_json::{json, Map, Value};

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn epg_event() -> Event {
        Event::from_record(record(json!({
            "begin_timestamp": 1503612900,
            "duration_sec": 3300,
            "id": 22997,
            "longdesc": "",
            "shortdesc": "Muss ich wirklich dazwischen?",
            "sname": "zdf_neo",
            "sref": "1:0:1:6D6E:437:66:FFFF0000:0:0:0:",
            "title": "Orange is the New Black"
        })))
        .unwrap()
    }

    fn radio_timer() -> Event {
        Event::from_record(record(json!({
            "begin": 1504810500,
            "end": 1504818300,
            "eit": 6784,
            "name": "DASDING Sprechstunde",
            "description": "",
            "descriptionextended": "N/A",
            "servicename": "DASDING",
            "serviceref": "1:0:2:6F37:431:A401:FFFF0000:0:0:0:"
        })))
        .unwrap()
    }

    #[test]
    fn test_render_event_default() {
        let text = render_event(&epg_event(), 0, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "25.08.2017 00:15 -- 01:10 #022997 zdf_neo",
                "Orange is the New Black - Muss ich wirklich dazwischen?",
            ]
        );
    }

    #[test]
    fn test_render_event_verbose() {
        let text = render_event(&epg_event(), 2, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "55 mins. ");
        assert_eq!(lines[3], "PSEUDO ID: None");
    }

    #[test]
    fn test_render_event_technical() {
        let text = render_event(&epg_event(), 0, true);
        let header = text.lines().next().unwrap();

        assert_eq!(
            header,
            format!(
                "25.08.2017 00:15 -- 01:10 #022997 {:30} 1:0:1:6d6e:437:66:ffff0000:0:0:0:",
                "zdf_neo"
            )
        );
    }

    #[test]
    fn test_render_timer_without_shortinfo() {
        let text = render_event(&radio_timer(), 2, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "07.09.2017 20:55 -- 23:05 #006784 DASDING");
        assert_eq!(lines[1], "DASDING Sprechstunde");
        assert_eq!(lines[2], "130 mins. N/A");
        assert_eq!(
            lines[3],
            "PSEUDO ID: 9c357fbab2a36d905a9c2658eac6c11df1d23a85"
        );
    }

    #[test]
    fn test_timer_delete_url() {
        assert_eq!(
            timer_delete_url("http://enigma2.local", &radio_timer()),
            "http://enigma2.local/api/timerdelete?sRef=1%3A0%3A2%3A6F37%3A431%3AA401%3AFFFF0000%3A0%3A0%3A0%3A&begin=1504810500&end=1504818300"
        );
    }

    #[test]
    fn test_event_output_json() {
        let value = serde_json::to_value(EventOutput::from(&radio_timer())).unwrap();

        assert_eq!(value["title"], "DASDING Sprechstunde");
        assert_eq!(value["item_id"], 6784);
        assert_eq!(value["pseudo_id"], "9c357fbab2a36d905a9c2658eac6c11df1d23a85");
    }

    #[test]
    fn test_render_service() {
        let selected = ServiceFilter::default().select(vec![ServiceEntry {
            servicename: "arte".to_string(),
            servicereference: "1:0:1:6D6E:437:66:FFFF0000:0:0:0:".to_string(),
        }]);
        assert_eq!(selected.len(), 1);

        assert_eq!(
            render_service(&selected[0]),
            format!(
                "0x0066 TV    DVB-C {:50} 1:0:1:6D6E:437:66:FFFF0000:0:0:0:",
                "arte"
            )
        );
    }
}

// =============================================================================
// Exit Code Tests
// =============================================================================

mod exit_codes {
    use eha::api::Enigma2Error;
    use eha::cli::ExitCode;
    use eha::commands::exit_code_for;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
    }

    #[test]
    fn test_http_failures_are_network_errors() {
        let e = anyhow::Error::from(Enigma2Error::NotFound);
        assert_eq!(exit_code_for(&e), ExitCode::NetworkError);

        let e = anyhow::Error::from(Enigma2Error::ServerError(500));
        assert_eq!(exit_code_for(&e), ExitCode::NetworkError);
    }

    #[test]
    fn test_other_failures_are_errors() {
        let e = anyhow::Error::from(Enigma2Error::MissingKey("timers".into()));
        assert_eq!(exit_code_for(&e), ExitCode::Error);

        let e = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&e), ExitCode::Error);
    }

    #[test]
    fn test_default_log_directive() {
        assert_eq!(eha::logging::default_directive(0), "eha=info");
        assert_eq!(eha::logging::default_directive(2), "eha=debug,info");
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use eha::api::Enigma2Client;
    use eha::blacklist::Blacklist;
    use eha::cli::{
        ApiCmd, EpgSearchCmd, ExitCode, MovieListCmd, Output, ServiceListCmd, ServiceSort,
        TimerListCmd, ZapCmd,
    };
    use eha::commands;
    use eha::config::Config;
    use eha::services::ServiceDump;
    use mockito::{Matcher, Server};
    use tempfile::TempDir;

    const BOUQUET: &str =
        r#"1:7:1:0:0:0:0:0:0:0:FROM BOUQUET "userbouquet.favourites.tv" ORDER BY bouquet"#;

    fn output() -> Output {
        Output {
            json: true,
            quiet: true,
            verbose: 0,
        }
    }

    fn client(server: &Server) -> Enigma2Client {
        Enigma2Client::with_base_url(server.url())
    }

    async fn mock_bouquet(server: &mut Server) -> (mockito::Mock, mockito::Mock) {
        let bouquets = server
            .mock("GET", "/api/getservices")
            .match_query(Matcher::Exact(String::new()))
            .with_status(200)
            .with_body(format!(
                r#"{{"services": [{{"servicename": "Favourites (TV)", "servicereference": {}}}]}}"#,
                serde_json::to_string(BOUQUET).unwrap()
            ))
            .create_async()
            .await;
        let services = server
            .mock("GET", "/api/getservices")
            .match_query(Matcher::UrlEncoded("sRef".into(), BOUQUET.into()))
            .with_status(200)
            .with_body(
                r#"{"services": [
                    {"servicename": "Sky Atlantic HD", "servicereference": "1:0:19:6E:D:85:FFFF0000:0:0:0:"},
                    {"servicename": "arte", "servicereference": "1:0:1:6D6E:437:66:FFFF0000:0:0:0:"},
                    {"servicename": "DASDING", "servicereference": "1:0:2:6F37:431:A401:FFFF0000:0:0:0:"}
                ]}"#,
            )
            .create_async()
            .await;
        (bouquets, services)
    }

    #[tokio::test]
    async fn test_timer_list_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/timerlist")
            .with_status(200)
            .with_body(
                r#"{"timers": [{
                    "begin": 1504810500, "end": 1504818300, "eit": 6784,
                    "name": "DASDING Sprechstunde", "description": "",
                    "descriptionextended": "N/A", "servicename": "DASDING",
                    "serviceref": "1:0:2:6F37:431:A401:FFFF0000:0:0:0:"
                }]}"#,
            )
            .create_async()
            .await;

        let code = commands::timer_list_cmd(TimerListCmd {}, &client(&server), &output()).await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_unreachable_receiver_is_network_error() {
        let client = Enigma2Client::with_base_url("http://127.0.0.1:1");

        let code = commands::timer_list_cmd(TimerListCmd {}, &client, &output()).await;

        assert_eq!(code, ExitCode::NetworkError);
    }

    #[tokio::test]
    async fn test_epg_search_with_unreadable_blacklist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blacklist.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/epgsearch")
            .expect(0)
            .create_async()
            .await;

        let cmd = EpgSearchCmd {
            query: "tatort".to_string(),
            technical: false,
            blacklist: Some(path),
        };
        let code =
            commands::epg_search_cmd(cmd, &client(&server), &Config::default(), &output()).await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_movie_list_persists_blacklist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/movielist")
            .with_status(200)
            .with_body(
                r#"{"movies": [
                    {"eventname": "SPUTNIK Black Beatz - Wiederholung", "recordingtime": 1505685300,
                     "length": "129:47", "servicename": "SPUTNIK",
                     "serviceref": "1:0:0:0:0:0:0:0:0:0:/media/hdd/movie/black_beatz.ts",
                     "filename": "/media/hdd/movie/black_beatz.ts", "description": "",
                     "descriptionExtended": "Feinster R'n'B, tighter Hip-Hop und die heissesten Tracks."},
                    {"eventname": "Aufnahme", "recordingtime": 1504104600, "length": "",
                     "servicename": "Das Erste HD",
                     "serviceref": "1:0:0:0:0:0:0:0:0:0:/media/hdd/movie/aufnahme.ts",
                     "description": "", "descriptionExtended": ""}
                ]}"#,
            )
            .create_async()
            .await;

        let cmd = MovieListCmd {
            persist_blacklist: Some(path.clone()),
            index: false,
        };
        let code = commands::movie_list_cmd(cmd, &client(&server), &output()).await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::Success);

        let blacklist = Blacklist::open(&path).unwrap();
        assert_eq!(blacklist.len(), 1);
        assert!(blacklist.contains("b1396152c351cf8e840d49d0bbb1cee6ae2c5eca"));
    }

    #[tokio::test]
    async fn test_service_list_dump() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("services.json");

        let mut server = Server::new_async().await;
        let (bouquets, services) = mock_bouquet(&mut server).await;

        let cmd = ServiceListCmd {
            sort: ServiceSort::Name,
            oid: Vec::new(),
            ns: Vec::new(),
            st: Vec::new(),
            dump: Some(path.clone()),
        };
        let code = commands::service_list_cmd(cmd, &client(&server), &output()).await;

        bouquets.assert_async().await;
        services.assert_async().await;
        assert_eq!(code, ExitCode::Success);

        let dump: ServiceDump =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(dump.services.len(), 2);
        assert!(dump.services.contains_key("1:0:19:6e:d:85:ffff0000:0:0:0:"));
    }

    #[tokio::test]
    async fn test_zap_by_name() {
        let mut server = Server::new_async().await;
        let _bouquet_mocks = mock_bouquet(&mut server).await;
        let zap = server
            .mock("GET", "/api/zap")
            .match_query(Matcher::UrlEncoded(
                "sRef".into(),
                "1:0:19:6E:D:85:FFFF0000:0:0:0:".into(),
            ))
            .with_status(200)
            .with_body(r#"{"result": true, "message": "Active service switched"}"#)
            .create_async()
            .await;

        let cmd = ZapCmd {
            service: "Sky Atlantic HD".to_string(),
            ns: None,
        };
        let code = commands::zap_cmd(cmd, &client(&server), &output()).await;

        zap.assert_async().await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_zap_unknown_service_is_rejected() {
        let mut server = Server::new_async().await;
        let _bouquet_mocks = mock_bouquet(&mut server).await;
        let zap = server.mock("GET", "/api/zap").expect(0).create_async().await;

        let cmd = ZapCmd {
            service: "No Such Channel".to_string(),
            ns: None,
        };
        let code = commands::zap_cmd(cmd, &client(&server), &output()).await;

        zap.assert_async().await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_api_call_missing_filter_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/currenttime")
            .with_status(200)
            .with_body(r#"{"result": true, "message": "12:00"}"#)
            .create_async()
            .await;

        let cmd = ApiCmd {
            call: "currenttime".to_string(),
            param: Vec::new(),
            filter_key: Some("timers".to_string()),
        };
        let code = commands::api_cmd(cmd, &client(&server), &output()).await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::Error);
    }
}
