//! Handles the engine's input and output with the client.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::io::stdin;
use std::sync::mpsc::*;
use std::thread;
use log::{error, info};

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Provides a pollable interface with the client using stdin and stdout. All input and output is
/// logged using the log crate (assuming a logger is set up).
///
/// Input is read on a dedicated thread so that the search can poll for new commands without
/// blocking. When the client closes its end of the pipe the channel disconnects, which callers
/// should treat the same as a request to quit.
#[derive(Debug)]
pub struct Client(Receiver<String>);

impl Client {
    /// Creates and returns a new interface.
    pub fn connect() -> Self {
        let (sender, receiver) = channel();
        thread::spawn(move || {
            Self::thread(sender);
        });

        Self(receiver)
    }

    /// Retrieves a line from the client. Blocks until one is available.
    pub fn recv(&self) -> Result<String, RecvError> {
        self.0.recv()
    }

    /// Tries to retrieve a line from the client, but does not block if none is available.
    pub fn try_recv(&self) -> Result<String, TryRecvError> {
        self.0.try_recv()
    }

    /// Sends a line to the client.
    pub fn send(s: &str) {
        println!("{}", s);
        info!("<engine>: {}", s);
    }

    /// A function run in a separate thread to get input from stdin. Returns, dropping the
    /// sender, when stdin reaches end of file or cannot be read.
    fn thread(sender: Sender<String>) {
        let stdin = stdin();

        loop {
            let mut line = String::new();

            match stdin.read_line(&mut line) {
                Ok(0) => {
                    info!("client at EOF");
                    return;
                },
                Ok(_) => {
                    let line = line.trim().to_string();
                    info!("<client>: {}", line);
                    if sender.send(line).is_err() {
                        return;
                    }
                },
                Err(err) => {
                    error!("io error: {}", err);
                    return;
                },
            }
        }
    }
}
