use std::{
    cell::RefCell,
    env,
    fs::File,
    io::{BufRead, BufReader},
    net::Ipv4Addr,
    path::{Path, PathBuf},
    process,
};

use duonet::{
    sim::{PeerId, SimNet, SimRadio, SimStack},
    CredentialOptions, NetworkDriver, NetworkRuntime, Security, SocketId, StaticIpConfig,
    WifiPolicy,
};
use embassy_time::Instant;

struct ScriptLine {
    line_no: usize,
    ms: u64,
    command: String,
    args: Vec<String>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let mut script_path: Option<PathBuf> = None;
    let mut expect_path: Option<PathBuf> = None;

    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--expect" => {
                idx += 1;
                let Some(path) = args.get(idx) else {
                    return Err("missing path after --expect".into());
                };
                expect_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown argument: {value}"));
            }
            value => {
                if script_path.is_some() {
                    return Err("multiple script paths provided".into());
                }
                script_path = Some(PathBuf::from(value));
            }
        }
        idx += 1;
    }

    let script_path = script_path.ok_or_else(usage)?;
    let script = parse_script(&script_path)?;

    let net = RefCell::new(SimNet::new());
    let mut replay = Replay {
        runtime: NetworkRuntime::new(SimStack::new(&net), SimRadio::new(), WifiPolicy::defaults()),
        net: &net,
        peers: Vec::new(),
    };

    let mut outcomes: Vec<String> = Vec::new();
    println!("result,ms,command,outcome");
    for line in &script {
        let outcome = replay
            .execute(line)
            .map_err(|e| format!("{}:{} {e}", script_path.display(), line.line_no))?;
        println!("result,{},{},{}", line.ms, line.command, outcome);
        outcomes.push(outcome);
    }

    if let Some(expect_path) = expect_path {
        let expected = parse_expected(&expect_path)?;
        if outcomes != expected {
            eprintln!("expected: {}", expected.join(","));
            eprintln!("actual:   {}", outcomes.join(","));
            return Err("outcome sequence mismatch".into());
        }
    }

    Ok(())
}

fn usage() -> String {
    "usage: net_replay <script.csv> [--expect expected.txt]".to_string()
}

struct Replay<'a> {
    runtime: NetworkRuntime<SimStack<'a>, SimRadio>,
    net: &'a RefCell<SimNet>,
    peers: Vec<PeerId>,
}

impl Replay<'_> {
    fn execute(&mut self, line: &ScriptLine) -> Result<String, String> {
        let now = Instant::from_millis(line.ms);
        let args = &line.args;
        let outcome = match line.command.as_str() {
            "ap" => {
                let security = match arg(args, 2) {
                    Ok(value) => value.parse::<Security>().map_err(|e| e.to_string())?,
                    Err(_) => Security::Wpa2,
                };
                self.runtime.wifi_mut().radio_mut().add_access_point(
                    arg(args, 0)?,
                    arg(args, 1)?,
                    security,
                );
                "ap=ok".to_string()
            }
            "credential" => {
                let options = CredentialOptions {
                    ssid: args.first().map(String::as_str),
                    password: args.get(1).map(String::as_str),
                    sec: args.get(2).map(String::as_str),
                    cipher: args.get(3).map(String::as_str),
                };
                match self.runtime.set_credential(&options, None) {
                    Ok(()) => "credential=ok".to_string(),
                    Err(err) => format!("credential={err}"),
                }
            }
            "on" => match self.runtime.on(None) {
                Ok(()) => "on=ok".to_string(),
                Err(err) => format!("on={err}"),
            },
            "off" => {
                self.runtime.off(None);
                "off=ok".to_string()
            }
            "disconnect" => {
                self.runtime.disconnect(None);
                "disconnect=ok".to_string()
            }
            "connect" => match self.runtime.connect(now, None) {
                Ok(()) => "connect=ok".to_string(),
                Err(err) => format!("connect={err}"),
            },
            "auto" => {
                let enabled = arg(args, 0)? == "on";
                match self.runtime.set_auto_connect(enabled) {
                    Ok(()) => format!("auto={}", if enabled { "on" } else { "off" }),
                    Err(err) => format!("auto={err}"),
                }
            }
            "wifi_listen" => {
                if arg(args, 0)? == "on" {
                    match self.runtime.start_listen(None) {
                        Ok(()) => "listening=on".to_string(),
                        Err(err) => format!("listening={err}"),
                    }
                } else {
                    self.runtime.stop_listen(None);
                    "listening=off".to_string()
                }
            }
            "static_ip" => {
                let config = StaticIpConfig::new(
                    parse_addr(arg(args, 0)?)?,
                    parse_addr(arg(args, 1)?)?,
                    parse_addr(arg(args, 2)?)?,
                    parse_addr(arg(args, 3)?)?,
                )
                .map_err(|e| e.to_string())?;
                self.runtime.set_static_ip(&config, None);
                match self.runtime.use_static_ip(None) {
                    Ok(()) => "addressing=static".to_string(),
                    Err(err) => format!("addressing={err}"),
                }
            }
            "dynamic_ip" => {
                self.runtime.use_dynamic_ip(None);
                "addressing=dhcp".to_string()
            }
            "credentials" => {
                let stored = self.runtime.credentials(None);
                let names: Vec<&str> = stored.iter().map(|c| c.ssid.as_str()).collect();
                format!("credentials={}", names.join("+"))
            }
            "idle" => {
                let step = self.runtime.step(now);
                format!("state={}", step.state.as_str())
            }
            "drop_link" => {
                self.runtime.wifi_mut().radio_mut().drop_link();
                "link=down".to_string()
            }
            "check_error" => format!("check={}", self.runtime.check_error()),
            "details" => {
                let details = self.runtime.details(None);
                format!(
                    "details={}/auto={}/failed={}/retries={}",
                    details.state.as_str(),
                    details.auto_connect,
                    details.connect_failed,
                    details.retry_count
                )
            }
            "reachable" => {
                let addr = parse_addr(arg(args, 0)?)?;
                let port = parse_port(arg(args, 1)?)?;
                self.net.borrow_mut().add_reachable(addr, port);
                "reachable=ok".to_string()
            }
            "listen" => {
                let port = parse_port(arg(args, 0)?)?;
                socket_outcome(self.runtime.create_socket(None, port))
            }
            "open" => {
                let addr = parse_addr(arg(args, 0)?)?;
                let port = parse_port(arg(args, 1)?)?;
                socket_outcome(self.runtime.create_socket(Some(addr), port))
            }
            "accept" => match self.runtime.accept(parse_socket(arg(args, 0)?)?) {
                Ok(Some(id)) => format!("socket={id}"),
                Ok(None) => "none".to_string(),
                Err(err) => format!("error={}", err.code()),
            },
            "recv" => {
                let mut buf = vec![0u8; self.runtime.chunk_size()];
                let read = self.runtime.recv(parse_socket(arg(args, 0)?)?, &mut buf);
                if read == 0 {
                    "data=".to_string()
                } else {
                    format!("data={}", String::from_utf8_lossy(&buf[..read]))
                }
            }
            "send" => {
                let id = parse_socket(arg(args, 0)?)?;
                match self.runtime.send(id, arg(args, 1)?.as_bytes()) {
                    Ok(written) => format!("sent={written}"),
                    Err(err) => format!("error={}", err.code()),
                }
            }
            "close" => {
                self.runtime.close_socket(parse_socket(arg(args, 0)?)?);
                "closed".to_string()
            }
            "peer_connect" => {
                let port = parse_port(arg(args, 0)?)?;
                match self.net.borrow_mut().peer_connect(port) {
                    Some(peer) => {
                        self.peers.push(peer);
                        format!("peer={}", self.peers.len() - 1)
                    }
                    None => "peer=refused".to_string(),
                }
            }
            "peer_send" => {
                let peer = self.peer(arg(args, 0)?)?;
                let sent = self.net.borrow_mut().peer_send(peer, arg(args, 1)?.as_bytes());
                format!("peer_sent={sent}")
            }
            "peer_close" => {
                let peer = self.peer(arg(args, 0)?)?;
                self.net.borrow_mut().peer_close(peer);
                "peer_closed".to_string()
            }
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(outcome)
    }

    fn peer(&self, raw: &str) -> Result<PeerId, String> {
        let index = raw
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid peer '{raw}': {e}"))?;
        self.peers
            .get(index)
            .copied()
            .ok_or_else(|| format!("unknown peer {index}"))
    }
}

fn socket_outcome(result: Result<SocketId, duonet::SocketError>) -> String {
    match result {
        Ok(id) => format!("socket={id}"),
        Err(err) => format!("error={}", err.code()),
    }
}

fn arg(args: &[String], index: usize) -> Result<&str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument {}", index + 1))
}

fn parse_addr(raw: &str) -> Result<Ipv4Addr, String> {
    raw.trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid address '{}': {e}", raw.trim()))
}

fn parse_port(raw: &str) -> Result<u16, String> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {e}", raw.trim()))
}

fn parse_socket(raw: &str) -> Result<SocketId, String> {
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid socket '{}': {e}", raw.trim()))?;
    SocketId::from_raw(value).ok_or_else(|| format!("invalid socket id {value}"))
}

fn parse_script(path: &Path) -> Result<Vec<ScriptLine>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out: Vec<ScriptLine> = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').collect();
        if parts[0].trim() != "net_script" {
            continue;
        }
        if parts.len() < 3 {
            return Err(format!(
                "{}:{} invalid script line, expected at least 3 columns",
                path.display(),
                line_no
            ));
        }

        let ms = parts[1].trim().parse::<u64>().map_err(|e| {
            format!(
                "{}:{} invalid ms '{}': {}",
                path.display(),
                line_no,
                parts[1].trim(),
                e
            )
        })?;
        out.push(ScriptLine {
            line_no,
            ms,
            command: parts[2].trim().to_ascii_lowercase(),
            args: parts[3..].iter().map(|part| part.trim().to_string()).collect(),
        });
    }

    Ok(out)
}

fn parse_expected(path: &Path) -> Result<Vec<String>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut outcomes = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        outcomes.push(token.to_string());
    }

    Ok(outcomes)
}
