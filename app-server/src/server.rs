use log::{debug, info, trace, warn};

use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Select, Sender};

use failure::{Error, Fail};

use websocket::client::sync::Client;
use websocket::receiver::Reader;
use websocket::sender::Writer;
use websocket::server::upgrade::sync::Buffer;
use websocket::server::upgrade::WsUpgrade;
use websocket::server::NoTlsAcceptor;
use websocket::sync::Server as WsServer;
use websocket::OwnedMessage;

#[derive(Debug, Fail)]
enum ServerError {
  #[fail(display = "Unable to accept connection: {}", cause)]
  RequestAccept { cause: String },
  #[fail(display = "Failed to retrieve client address: {}", cause)]
  ClientAddress { cause: String },
  #[fail(display = "Only localhost connections are allowed, but found {:?}", ip)]
  NotLocalhost { ip: String },
  #[fail(display = "Failed to split client IO: {}", cause)]
  ClientSplit { cause: String },
  #[fail(display = "Failed to create the {} thread: {}", name, cause)]
  Start { name: String, cause: String },
}

/// Sends to every connected client.
pub const ALL_PORTS: u16 = 0;

#[derive(Debug, Clone)]
pub enum Message {
  Connection { port: u16, sender: Sender<Message> },
  Close { port: u16 },
  Incoming { data: String, port: u16 },
  Outgoing { data: String, port: u16 },
  Stop,
}

impl Message {
  pub fn is_stop(&self) -> bool {
    match self {
      Message::Stop => true,
      _ => false,
    }
  }

  pub fn is_close(&self) -> bool {
    match self {
      Message::Close { .. } | Message::Stop => true,
      _ => false,
    }
  }

  pub fn into_websocket_message(self) -> Option<OwnedMessage> {
    match self {
      Message::Close { .. } | Message::Stop => Some(OwnedMessage::Close(None)),
      Message::Outgoing { data, .. } => Some(OwnedMessage::Text(data)),
      Message::Connection { .. } | Message::Incoming { .. } => None,
    }
  }
}

type Clients = HashMap<u16, Sender<Message>>;

///! Localhost WebSocket server.
///!
///! Text messages from every client come out of `receiver()`, and anything sent through
///! `sender()` as `Outgoing` reaches one client or all of them (`ALL_PORTS`).
pub struct Server {
  server_send_tx: Sender<Message>,
  server_receive_rx: Receiver<Message>,
  router_thread: JoinHandle<()>,
}

impl Server {
  pub fn new(port: u16) -> Result<Server, Error> {
    let (server_send_tx, server_send_rx) = crossbeam_channel::unbounded::<Message>();
    let (server_receive_tx, server_receive_rx) = crossbeam_channel::unbounded::<Message>();
    let (client_receive_tx, client_receive_rx) = crossbeam_channel::unbounded::<Message>();

    let addr = format!("127.0.0.1:{}", port);
    info!("Starting WebSocket server at {} ...", addr);
    let ws_server = WsServer::bind(addr)?;

    let router_thread = Self::start_router(server_send_rx, client_receive_rx, server_receive_tx)?;

    // The accepting thread blocks on the listener and ends with the process.
    Self::start_server(client_receive_tx, ws_server)?;

    Ok(Server {
      server_send_tx,
      server_receive_rx,
      router_thread,
    })
  }

  fn start_router(
    server_send_rx: Receiver<Message>,
    client_receive_rx: Receiver<Message>,
    server_receive_tx: Sender<Message>,
  ) -> Result<JoinHandle<()>, ServerError> {
    thread::Builder::new()
      .name("ws-router".into())
      .spawn(move || {
        let mut clients: Clients = HashMap::new();

        let mut select = Select::new();
        let server_index = select.recv(&server_send_rx);
        let client_index = select.recv(&client_receive_rx);

        loop {
          let oper = select.select();
          let result = match oper.index() {
            index if index == server_index => oper.recv(&server_send_rx),
            index if index == client_index => oper.recv(&client_receive_rx),
            _ => unreachable!(),
          };
          match result {
            Ok(msg) => {
              let is_stop = msg.is_stop();
              Self::dispatch_message(&mut clients, &server_receive_tx, msg);
              if is_stop {
                break;
              }
            }
            Err(_) => {
              debug!("The router channels were closed");
              break;
            }
          };
        }
      })
      .map_err(|err| ServerError::Start {
        name: "ws-router".into(),
        cause: err.to_string(),
      })
  }

  fn dispatch_message(clients: &mut Clients, server_receive_tx: &Sender<Message>, msg: Message) {
    match msg {
      Message::Connection { port, sender } => {
        clients.insert(port, sender);
      }
      Message::Close { port } => {
        if port == ALL_PORTS {
          Self::send_to_all(clients, &msg);
          clients.clear();
        } else {
          clients.remove(&port);
        }
      }

      Message::Incoming { .. } => {
        drop(server_receive_tx.send(msg));
      }
      Message::Outgoing { port, .. } => {
        if port == ALL_PORTS {
          Self::send_to_all(clients, &msg);
        } else if let Some(send_tx) = clients.get(&port) {
          drop(send_tx.send(msg));
        }
      }

      Message::Stop => {
        Self::send_to_all(clients, &msg);
        clients.clear();
      }
    };
  }

  fn send_to_all(clients: &Clients, msg: &Message) {
    clients
      .values()
      .for_each(|send_tx| drop(send_tx.send(msg.clone())));
  }

  fn start_server(
    client_receive_tx: Sender<Message>,
    server: WsServer<NoTlsAcceptor>,
  ) -> Result<(), ServerError> {
    thread::Builder::new()
      .name("ws-server".into())
      .spawn(move || {
        for request in server.filter_map(Result::ok) {
          Self::accept_request(client_receive_tx.clone(), request);
        }
      })
      .map(|_| ())
      .map_err(|err| ServerError::Start {
        name: "ws-server".into(),
        cause: err.to_string(),
      })
  }

  fn accept_request(
    client_receive_tx: Sender<Message>,
    request: WsUpgrade<TcpStream, Option<Buffer>>,
  ) {
    let spawned = thread::Builder::new()
      .name("ws-client".into())
      .spawn(move || {
        let accepted = request
          .accept()
          .map_err(|(_, err)| ServerError::RequestAccept {
            cause: err.to_string(),
          })
          .and_then(|mut client| {
            Self::ensure_valid_source_or_close(&mut client).and_then(|addr| {
              info!("New WebSocket connection: {}", addr);
              client
                .split()
                .map_err(|err| ServerError::ClientSplit {
                  cause: err.to_string(),
                })
                .map(|(receiver, sender)| (addr, receiver, sender))
            })
          });

        match accepted {
          Ok((addr, receiver, sender)) => {
            let (client_send_tx, client_send_rx) = crossbeam_channel::unbounded::<Message>();

            drop(client_receive_tx.send(Message::Connection {
              port: addr.port(),
              sender: client_send_tx,
            }));

            let internal_tx = Self::send_messages(addr, client_send_rx, sender);

            Self::receive_messages(addr, client_receive_tx, internal_tx, receiver);
          }
          Err(err) => warn!("Rejected WebSocket connection: {}", err),
        }
      });

    if let Err(err) = spawned {
      warn!("Couldn't spawn a thread for the new connection: {}", err);
    }
  }

  fn send_messages(
    addr: SocketAddr,
    send_rx: Receiver<Message>,
    mut sender: Writer<TcpStream>,
  ) -> Sender<Message> {
    let (internal_tx, internal_rx) = crossbeam_channel::unbounded::<Message>();

    let thread_name = format!("ws-send-{}", addr.port());
    let spawned = thread::Builder::new().name(thread_name).spawn(move || {
      let mut sel = Select::new();
      let send_index = sel.recv(&send_rx);
      let internal_index = sel.recv(&internal_rx);

      loop {
        let oper = sel.select();
        let try_msg = match oper.index() {
          index if index == send_index => oper.recv(&send_rx),
          index if index == internal_index => oper.recv(&internal_rx),
          _ => unreachable!(),
        };

        match try_msg {
          Ok(msg) => {
            let is_close = msg.is_close();
            if let Some(ws_msg) = msg.into_websocket_message() {
              if let Err(err) = sender.send_message(&ws_msg) {
                trace!("{:?} Failed to send: {:?}", addr, err);
                break;
              }
            }
            if is_close {
              break;
            }
          }
          Err(_) => break,
        }
      }

      trace!("{:?} Finished thread for sending messages", addr);
    });

    if let Err(err) = spawned {
      warn!("{:?} Couldn't spawn the sending thread: {}", addr, err);
    }

    internal_tx
  }

  fn receive_messages(
    addr: SocketAddr,
    receive_tx: Sender<Message>,
    internal_tx: Sender<Message>,
    mut receiver: Reader<TcpStream>,
  ) {
    let port = addr.port();

    for message in receiver.incoming_messages() {
      match message {
        Ok(OwnedMessage::Text(data)) => {
          trace!("{:?} Text: {:?}", addr, data);
          drop(receive_tx.send(Message::Incoming { port, data }));
        }
        Ok(OwnedMessage::Binary(data)) => match String::from_utf8(data) {
          Ok(data) => drop(receive_tx.send(Message::Incoming { port, data })),
          Err(err) => debug!("{:?} Ignoring binary message: {}", addr, err),
        },
        Ok(OwnedMessage::Close(data)) => {
          trace!("{:?} Close: {:?}", addr, data);
          break;
        }
        Err(err) => {
          // Forced close, the client probably went away without a handshake
          trace!("{:?} Err: {:?}", addr, err);
          break;
        }
        _ => {}
      }
    }

    drop(internal_tx.send(Message::Close { port }));
    drop(receive_tx.send(Message::Close { port }));
    info!("WebSocket connection closed: {}", addr);
  }

  fn ensure_valid_source_or_close(
    client: &mut Client<TcpStream>,
  ) -> Result<SocketAddr, ServerError> {
    client
      .peer_addr()
      .map_err(|err| ServerError::ClientAddress {
        cause: err.to_string(),
      })
      .and_then(|addr| {
        let ip = addr.ip();
        if ip.is_loopback() {
          Ok(addr)
        } else {
          drop(client.send_message(&OwnedMessage::Close(None)));
          Err(ServerError::NotLocalhost { ip: ip.to_string() })
        }
      })
  }

  pub fn receiver(&self) -> Receiver<Message> {
    self.server_receive_rx.clone()
  }

  pub fn sender(&self) -> Sender<Message> {
    self.server_send_tx.clone()
  }

  /// Closes every client connection and stops routing messages.
  pub fn close(self) {
    info!("Closing server ...");

    drop(self.server_send_tx.send(Message::Stop));
    drop(self.router_thread.join());
  }
}
