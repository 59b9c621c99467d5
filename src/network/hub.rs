use std::collections::HashMap;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use log::{debug, info, trace, warn};
use tungstenite::protocol::Role;
use tungstenite::{Message as WsMessage, WebSocket};
use url::Url;

use super::{MessageSink, PeerId, Transport};

pub const DEFAULT_PORT: u16 = 23412;

// how many ports after the requested one we try if it is taken
const PORT_ATTEMPTS: u16 = 10;

// a peer that stops reading must not stall the shutdown flush
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/*====================================================================================================================*/

enum HubEvent {
    Joined { socket: WebSocket<TcpStream>, addr: String, role: Role },
    Received(PeerId, String),
    Left(PeerId),
}

struct Peer {
    addr: String,
    outbox: mpsc::Sender<String>,
    writer: thread::JoinHandle<()>,
}

impl Peer {
    fn send(&self, id: PeerId, text: &str) {
        if self.outbox.send(text.to_owned()).is_err() {
            debug!("Dropping message for {}: connection already closed", id);
        }
    }
}

/// Websocket implementation of the broadcast channel.
///
/// Every peer gets a reader and a writer thread, but all events end up in a single queue, so the sink sees them
/// strictly one after the other on the thread calling `run`.
pub struct BroadcastHub {
    peers: HashMap<PeerId, Peer>,
    next_peer_id: u32,

    events_tx: mpsc::Sender<HubEvent>,
    events_rx: mpsc::Receiver<HubEvent>,

    local_port: u16,
    stop_requested: bool,
}

impl BroadcastHub {
    pub fn listen(port: u16) -> anyhow::Result<Self> {
        let listener = bind(port)?;
        let local_port = listener.local_addr().context("Listen socket has no address")?.port();

        let (events_tx, events_rx) = mpsc::channel();

        let accept_tx = events_tx.clone();
        thread::spawn(move || accept_loop(listener, accept_tx));

        Ok(BroadcastHub {
            peers: HashMap::new(),
            next_peer_id: 1,
            events_tx,
            events_rx,
            local_port,
            stop_requested: false,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Connect to a remote peer. It joins the channel once the event loop runs.
    pub fn dial(&mut self, host: &str, port: u16) -> anyhow::Result<()> {
        let url = Url::parse(&format!("ws://{}:{}/", host, port)).with_context(|| format!("Bad address {}", host))?;

        let addrs = url
            .socket_addrs(|| Some(DEFAULT_PORT))
            .with_context(|| format!("Could not resolve {}", url))?;
        let stream = TcpStream::connect(&*addrs).with_context(|| format!("Could not connect to {}", url))?;

        let (socket, _response) = tungstenite::client(url.as_str(), stream)
            .map_err(|err| anyhow!("Websocket handshake with {} failed: {}", url, err))?;

        info!("Connected to {}", url);

        self.events_tx
            .send(HubEvent::Joined {
                socket,
                addr: url.to_string(),
                role: Role::Client,
            })
            .map_err(|_| anyhow!("Event queue closed"))
    }

    /// Deliver events to `sink` until it requests a stop. Pending outbound messages are flushed before returning.
    pub fn run<S: MessageSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        self.stop_requested = false;

        let result = self.event_loop(sink);

        self.shutdown();

        result
    }

    fn event_loop<S: MessageSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        while !self.stop_requested {
            // we hold a sender ourselves, so this never disconnects
            let Ok(event) = self.events_rx.recv() else {
                break;
            };

            match event {
                HubEvent::Joined { socket, addr, role } => {
                    if let Some(id) = self.register(socket, addr, role) {
                        sink.on_new_connection(id, self);
                    }
                }
                HubEvent::Received(from, text) => {
                    for line in text.lines().filter(|line| !line.is_empty()) {
                        trace!("< {}: {}", from, line);

                        self.relay(from, line);
                        sink.on_message(line, self)?;

                        if self.stop_requested {
                            break;
                        }
                    }
                }
                HubEvent::Left(id) => {
                    if let Some(peer) = self.peers.remove(&id) {
                        info!("{} ({}) disconnected", id, peer.addr);
                    }
                }
            }
        }

        Ok(())
    }

    fn register(&mut self, socket: WebSocket<TcpStream>, addr: String, role: Role) -> Option<PeerId> {
        let writer_socket = match writer_websocket(&socket, role) {
            Ok(writer_socket) => writer_socket,
            Err(err) => {
                warn!("Dropping connection from {}: {}", addr, err);
                return None;
            }
        };

        let id = PeerId(self.next_peer_id);
        self.next_peer_id += 1;

        let events_tx = self.events_tx.clone();
        thread::spawn(move || read_loop(socket, id, events_tx));

        let (outbox, outbox_rx) = mpsc::channel();
        let writer = thread::spawn(move || write_loop(writer_socket, id, outbox_rx));

        info!("{} joined from {}", id, addr);

        self.peers.insert(id, Peer { addr, outbox, writer });

        Some(id)
    }

    // forward a line to everyone but its sender, so chained peers all see it
    fn relay(&self, from: PeerId, line: &str) {
        let text = format!("{}\n", line);

        for (&id, peer) in self.peers.iter().filter(|&(&id, _)| id != from) {
            peer.send(id, &text);
        }
    }

    fn shutdown(&mut self) {
        for (id, peer) in self.peers.drain() {
            // closing the outbox ends the writer once everything queued is sent
            drop(peer.outbox);

            if peer.writer.join().is_err() {
                warn!("Writer thread of {} panicked", id);
            }
        }
    }
}

impl Transport for BroadcastHub {
    fn broadcast(&mut self, text: &str) {
        trace!("> all: {}", text.trim_end());

        for (&id, peer) in &self.peers {
            peer.send(id, text);
        }
    }

    fn send_to(&mut self, peer: PeerId, text: &str) {
        trace!("> {}: {}", peer, text.trim_end());

        match self.peers.get(&peer) {
            Some(connection) => connection.send(peer, text),
            None => warn!("Can't send to {}: not connected", peer),
        }
    }

    fn request_stop(&mut self) {
        self.stop_requested = true;
    }
}

/*====================================================================================================================*/

fn bind(port: u16) -> anyhow::Result<TcpListener> {
    if port == 0 {
        return TcpListener::bind(("0.0.0.0", 0)).context("Could not open listen socket");
    }

    for candidate in (0..PORT_ATTEMPTS).filter_map(|offset| port.checked_add(offset)) {
        match TcpListener::bind(("0.0.0.0", candidate)) {
            Ok(listener) => {
                if candidate != port {
                    warn!("Port {} is taken, using {} instead", port, candidate);
                }
                return Ok(listener);
            }
            Err(err) => debug!("Could not bind port {}: {}", candidate, err),
        }
    }

    Err(anyhow!("No free port in {}..{}", port, port.saturating_add(PORT_ATTEMPTS)))
}

fn accept_loop(listener: TcpListener, events_tx: mpsc::Sender<HubEvent>) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Failed to accept connection: {}", err);
                continue;
            }
        };

        let events_tx = events_tx.clone();

        // handshake off the accept thread, a slow peer must not block others
        thread::spawn(move || {
            let addr = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown address".to_owned());

            match tungstenite::accept(stream) {
                Ok(socket) => {
                    let _ = events_tx.send(HubEvent::Joined {
                        socket,
                        addr,
                        role: Role::Server,
                    });
                }
                Err(err) => warn!("Websocket handshake with {} failed: {}", addr, err),
            }
        });
    }
}

fn read_loop(mut socket: WebSocket<TcpStream>, id: PeerId, events_tx: mpsc::Sender<HubEvent>) {
    loop {
        match socket.read_message() {
            Ok(WsMessage::Text(text)) => {
                if events_tx.send(HubEvent::Received(id, text)).is_err() {
                    return;
                }
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(other) => trace!("Ignoring non-text frame from {}: {:?}", id, other),
            Err(err) => {
                debug!("Reading from {} failed: {}", id, err);
                break;
            }
        }
    }

    let _ = events_tx.send(HubEvent::Left(id));
}

fn write_loop(mut socket: WebSocket<TcpStream>, id: PeerId, outbox: mpsc::Receiver<String>) {
    for text in outbox {
        if let Err(err) = socket.write_message(WsMessage::Text(text)) {
            warn!("Writing to {} failed: {}", id, err);
            return;
        }
    }

    let _ = socket.close(None);
    let _ = socket.write_pending();
}

fn writer_websocket(socket: &WebSocket<TcpStream>, role: Role) -> io::Result<WebSocket<TcpStream>> {
    let writer_socket = clone_websocket(socket, role)?;
    writer_socket.get_ref().set_write_timeout(Some(WRITE_TIMEOUT))?;
    Ok(writer_socket)
}

// reading and writing happen on different threads, each with its own handle on the same stream
fn clone_websocket(socket: &WebSocket<TcpStream>, role: Role) -> io::Result<WebSocket<TcpStream>> {
    let stream = socket.get_ref().try_clone()?;
    let config = *socket.get_config();
    Ok(WebSocket::from_raw_socket(stream, role, Some(config)))
}

/*====================================================================================================================*/

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    use pretty_assertions::assert_eq;
    use tungstenite::protocol::Role;
    use tungstenite::{Message as WsMessage, WebSocket};

    use super::{writer_websocket, BroadcastHub, WRITE_TIMEOUT};
    use crate::network::{Message, MessageSink, PeerId, Transport};

    const GREETING: &str = "pos O 0 0 0 <1, 0, 0, 1, 1>\n";

    // greets every newcomer and stops on quit
    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<String>,
        joined: Vec<PeerId>,
    }

    impl MessageSink for RecordingSink {
        type Error = Infallible;

        fn on_message(&mut self, line: &str, transport: &mut dyn Transport) -> Result<(), Infallible> {
            self.lines.push(line.to_owned());

            if Message::parse(line) == Message::Quit {
                transport.request_stop();
            }

            Ok(())
        }

        fn on_new_connection(&mut self, peer: PeerId, transport: &mut dyn Transport) {
            self.joined.push(peer);
            transport.send_to(peer, GREETING);
        }
    }

    fn url(port: u16) -> String {
        format!("ws://127.0.0.1:{}/", port)
    }

    #[test]
    fn test_writer_has_write_timeout() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let socket = WebSocket::from_raw_socket(stream, Role::Client, None);

        let writer_socket = writer_websocket(&socket, Role::Client).unwrap();

        assert_eq!(writer_socket.get_ref().write_timeout().unwrap(), Some(WRITE_TIMEOUT));
    }

    #[test]
    fn test_greeting_and_quit() {
        let mut hub = BroadcastHub::listen(0).unwrap();
        let port = hub.local_port();

        let client = thread::spawn(move || {
            let (mut socket, _) = tungstenite::connect(url(port).as_str()).unwrap();

            let greeting = socket.read_message().unwrap().into_text().unwrap();
            socket.write_message(WsMessage::Text("hello\r\nquit\n".to_owned())).unwrap();

            greeting
        });

        let mut sink = RecordingSink::default();
        hub.run(&mut sink).unwrap();

        assert_eq!(client.join().unwrap(), GREETING);
        assert_eq!(sink.lines, vec!["hello", "quit"]);
        assert_eq!(sink.joined.len(), 1);
    }

    #[test]
    fn test_lines_are_relayed_to_other_peers() {
        let mut hub = BroadcastHub::listen(0).unwrap();
        let port = hub.local_port();

        let (ready_tx, ready_rx) = mpsc::channel();

        let listener = thread::spawn(move || {
            let (mut socket, _) = tungstenite::connect(url(port).as_str()).unwrap();

            // the greeting proves we are registered
            socket.read_message().unwrap();
            ready_tx.send(()).unwrap();

            socket.read_message().unwrap().into_text().unwrap()
        });

        let speaker = thread::spawn(move || {
            ready_rx.recv().unwrap();

            let (mut socket, _) = tungstenite::connect(url(port).as_str()).unwrap();
            socket.read_message().unwrap();
            socket.write_message(WsMessage::Text("pos X 0 0 0 <1, 0, 0, 1, 1>\nquit\n".to_owned())).unwrap();
        });

        let mut sink = RecordingSink::default();
        hub.run(&mut sink).unwrap();
        speaker.join().unwrap();

        assert_eq!(listener.join().unwrap(), "pos X 0 0 0 <1, 0, 0, 1, 1>\n");
        assert_eq!(sink.lines, vec!["pos X 0 0 0 <1, 0, 0, 1, 1>", "quit"]);
        assert_eq!(sink.joined.len(), 2);
    }
}
