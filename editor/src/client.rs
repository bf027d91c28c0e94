use ot::{OtError, Selection, TextOperation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("There is no pending operation to acknowledge")]
    NoPendingOperation,
    #[error("Ot Error: {0}")]
    Ot(#[from] OtError),
}

/// Where the client stands relative to the server.
///
/// - `Synchronized`: no operation is in flight.
/// - `AwaitingConfirm`: `outstanding` was sent to the server and has not been acknowledged yet.
/// - `AwaitingWithBuffer`: same as above, plus the local edits made since then, composed into
///   `buffer`. The buffer is sent once `outstanding` is acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientState {
    Synchronized,
    AwaitingConfirm {
        outstanding: TextOperation,
    },
    AwaitingWithBuffer {
        outstanding: TextOperation,
        buffer: TextOperation,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// The user changed the document.
    ApplyClient(TextOperation),
    /// Another client's operation arrived from the server.
    ApplyServer(TextOperation),
    /// The server acknowledged our outstanding operation.
    ServerAck,
    /// The connection to the server was re-established.
    Resend,
}

/// Side effects of a transition. The caller performs them in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEffect {
    SendOperation {
        revision: u64,
        operation: TextOperation,
    },
    /// Apply the operation to the local document.
    ApplyOperation(TextOperation),
}

impl ClientState {
    /// Computes the state that follows `event`. `revision` is the client's revision after the
    /// event has been counted.
    pub fn step(
        &self,
        event: ClientEvent,
        revision: u64,
    ) -> Result<(ClientState, Vec<ClientEffect>), ClientError> {
        use ClientState::*;

        let transition = match (self, event) {
            (Synchronized, ClientEvent::ApplyClient(operation)) => (
                AwaitingConfirm {
                    outstanding: operation.clone(),
                },
                vec![ClientEffect::SendOperation {
                    revision,
                    operation,
                }],
            ),
            (Synchronized, ClientEvent::ApplyServer(operation)) => {
                (Synchronized, vec![ClientEffect::ApplyOperation(operation)])
            }
            (Synchronized, ClientEvent::ServerAck) => {
                return Err(ClientError::NoPendingOperation);
            }
            (Synchronized, ClientEvent::Resend) => (Synchronized, vec![]),

            (AwaitingConfirm { outstanding }, ClientEvent::ApplyClient(operation)) => (
                AwaitingWithBuffer {
                    outstanding: outstanding.clone(),
                    buffer: operation,
                },
                vec![],
            ),
            (AwaitingConfirm { outstanding }, ClientEvent::ApplyServer(operation)) => {
                //                   /\
                //     outstanding  /  \ operation
                //                 /    \
                //                 \    /
                //  op_prime        \  / outstanding_prime
                //  (applied to the  \/
                //  local document)
                let (outstanding_prime, op_prime) = ot::transform(outstanding, &operation)?;
                (
                    AwaitingConfirm {
                        outstanding: outstanding_prime,
                    },
                    vec![ClientEffect::ApplyOperation(op_prime)],
                )
            }
            (AwaitingConfirm { .. }, ClientEvent::ServerAck) => (Synchronized, vec![]),
            (AwaitingConfirm { outstanding }, ClientEvent::Resend) => (
                self.clone(),
                vec![ClientEffect::SendOperation {
                    revision,
                    operation: outstanding.clone(),
                }],
            ),

            (
                AwaitingWithBuffer {
                    outstanding,
                    buffer,
                },
                ClientEvent::ApplyClient(operation),
            ) => (
                AwaitingWithBuffer {
                    outstanding: outstanding.clone(),
                    buffer: ot::compose(buffer, &operation)?,
                },
                vec![],
            ),
            (
                AwaitingWithBuffer {
                    outstanding,
                    buffer,
                },
                ClientEvent::ApplyServer(operation),
            ) => {
                //                       /\
                //          outstanding /  \ operation
                //                     /    \
                //                    /\    /
                //           buffer  /  \  / outstanding_prime
                //                  /    \/ op_prime
                //                  \    /
                //   buffer_op_prime \  / buffer_prime
                //   (applied to the  \/
                //   local document)
                let (outstanding_prime, op_prime) = ot::transform(outstanding, &operation)?;
                let (buffer_prime, buffer_op_prime) = ot::transform(buffer, &op_prime)?;
                (
                    AwaitingWithBuffer {
                        outstanding: outstanding_prime,
                        buffer: buffer_prime,
                    },
                    vec![ClientEffect::ApplyOperation(buffer_op_prime)],
                )
            }
            (AwaitingWithBuffer { buffer, .. }, ClientEvent::ServerAck) => (
                AwaitingConfirm {
                    outstanding: buffer.clone(),
                },
                vec![ClientEffect::SendOperation {
                    revision,
                    operation: buffer.clone(),
                }],
            ),
            (AwaitingWithBuffer { outstanding, .. }, ClientEvent::Resend) => (
                self.clone(),
                vec![ClientEffect::SendOperation {
                    revision,
                    operation: outstanding.clone(),
                }],
            ),
        };
        Ok(transition)
    }

    /// Maps a selection known as of the latest server revision into the local document, which may
    /// be ahead of the server by the outstanding operation and the buffer.
    pub fn transform_selection(&self, selection: &Selection) -> Selection {
        match self {
            ClientState::Synchronized => selection.clone(),
            ClientState::AwaitingConfirm { outstanding } => selection.transform(outstanding),
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => selection.transform(outstanding).transform(buffer),
        }
    }
}

/// Optimistic concurrency control for one client: local edits are applied right away and sent to
/// the server one at a time, while operations from the server are transformed against whatever
/// the server has not seen yet.
#[derive(Clone, Debug)]
pub struct Client {
    revision: u64,
    state: ClientState,
}

impl Client {
    pub fn new(revision: u64) -> Self {
        Self {
            revision,
            state: ClientState::Synchronized,
        }
    }

    /// The next revision expected from the server.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn apply_client(
        &mut self,
        operation: TextOperation,
    ) -> Result<Vec<ClientEffect>, ClientError> {
        self.step(ClientEvent::ApplyClient(operation), self.revision)
    }

    pub fn apply_server(
        &mut self,
        operation: TextOperation,
    ) -> Result<Vec<ClientEffect>, ClientError> {
        self.step(ClientEvent::ApplyServer(operation), self.revision + 1)
    }

    pub fn server_ack(&mut self) -> Result<Vec<ClientEffect>, ClientError> {
        self.step(ClientEvent::ServerAck, self.revision + 1)
    }

    pub fn server_reconnect(&mut self) -> Result<Vec<ClientEffect>, ClientError> {
        self.step(ClientEvent::Resend, self.revision)
    }

    pub fn transform_selection(&self, selection: &Selection) -> Selection {
        self.state.transform_selection(selection)
    }

    /// The revision and state only change when the transition succeeds.
    fn step(&mut self, event: ClientEvent, revision: u64) -> Result<Vec<ClientEffect>, ClientError> {
        let (state, effects) = self.state.step(event, revision)?;
        self.revision = revision;
        self.state = state;
        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retain_insert(retain: usize, content: &str) -> TextOperation {
        let mut operation = TextOperation::new();
        operation.retain(retain).insert(content);
        operation
    }

    /// Drives a `Client` against a local document and records what it sends.
    struct TestClient {
        client: Client,
        doc: String,
        sent: Vec<(u64, TextOperation)>,
    }

    impl TestClient {
        fn new(revision: u64, doc: &str) -> Self {
            Self {
                client: Client::new(revision),
                doc: doc.to_string(),
                sent: vec![],
            }
        }

        fn perform(&mut self, effects: Vec<ClientEffect>) {
            for effect in effects {
                match effect {
                    ClientEffect::SendOperation {
                        revision,
                        operation,
                    } => self.sent.push((revision, operation)),
                    ClientEffect::ApplyOperation(operation) => {
                        self.doc = ot::apply(&self.doc, &operation).unwrap();
                    }
                }
            }
        }

        fn apply_client(&mut self, operation: TextOperation) {
            self.doc = ot::apply(&self.doc, &operation).unwrap();
            let effects = self.client.apply_client(operation).unwrap();
            self.perform(effects);
        }

        fn insert(&mut self, content: &str) {
            let operation = retain_insert(self.doc.chars().count(), content);
            self.apply_client(operation);
        }

        fn apply_server(&mut self, operation: TextOperation) {
            let effects = self.client.apply_server(operation).unwrap();
            self.perform(effects);
        }

        fn server_ack(&mut self) {
            let effects = self.client.server_ack().unwrap();
            self.perform(effects);
        }

        fn take_sent(&mut self) -> Option<(u64, TextOperation)> {
            let sent = self.sent.pop();
            assert!(self.sent.is_empty());
            sent
        }
    }

    fn outstanding_and_buffer(state: &ClientState) -> (Option<&TextOperation>, Option<&TextOperation>) {
        match state {
            ClientState::Synchronized => (None, None),
            ClientState::AwaitingConfirm { outstanding } => (Some(outstanding), None),
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => (Some(outstanding), Some(buffer)),
        }
    }

    #[test]
    fn test_client() {
        let mut t = TestClient::new(1, "lorem dolor");
        assert_eq!(t.client.revision(), 1);
        assert_eq!(t.client.state(), &ClientState::Synchronized);

        let mut operation = TextOperation::new();
        operation.retain(6).delete(1).insert("D").retain(4);
        t.apply_server(operation);
        assert_eq!(&t.doc, "lorem Dolor");
        assert_eq!(t.client.state(), &ClientState::Synchronized);
        assert_eq!(t.client.revision(), 2);

        let space_insert = retain_insert(11, " ");
        t.apply_client(space_insert.clone());
        assert_eq!(&t.doc, "lorem Dolor ");
        assert_eq!(
            t.client.state(),
            &ClientState::AwaitingConfirm {
                outstanding: space_insert.clone()
            }
        );
        assert_eq!(t.take_sent(), Some((2, space_insert)));

        let mut operation = TextOperation::new();
        operation.retain(5).insert(" ").retain(6);
        t.apply_server(operation);
        assert_eq!(&t.doc, "lorem  Dolor ");
        assert_eq!(t.client.revision(), 3);
        assert_eq!(
            outstanding_and_buffer(t.client.state()),
            (Some(&retain_insert(12, " ")), None)
        );

        t.insert("S");
        assert!(matches!(
            t.client.state(),
            ClientState::AwaitingWithBuffer { .. }
        ));
        t.insert("i");
        t.insert("t");
        assert_eq!(t.take_sent(), None);
        assert_eq!(&t.doc, "lorem  Dolor Sit");
        assert_eq!(
            outstanding_and_buffer(t.client.state()),
            (Some(&retain_insert(12, " ")), Some(&retain_insert(13, "Sit")))
        );

        let mut operation = TextOperation::new();
        operation.retain(6).insert("Ipsum").retain(6);
        t.apply_server(operation);
        assert_eq!(t.client.revision(), 4);
        assert_eq!(&t.doc, "lorem Ipsum Dolor Sit");
        assert_eq!(
            outstanding_and_buffer(t.client.state()),
            (Some(&retain_insert(17, " ")), Some(&retain_insert(18, "Sit")))
        );

        t.server_ack();
        assert_eq!(t.take_sent(), Some((5, retain_insert(18, "Sit"))));
        assert_eq!(t.client.revision(), 5);
        assert_eq!(
            outstanding_and_buffer(t.client.state()),
            (Some(&retain_insert(18, "Sit")), None)
        );

        t.server_ack();
        assert_eq!(t.client.revision(), 6);
        assert_eq!(t.take_sent(), None);
        assert_eq!(t.client.state(), &ClientState::Synchronized);
        assert_eq!(&t.doc, "lorem Ipsum Dolor Sit");
    }

    #[test]
    fn test_resend() {
        let mut client = Client::new(6);
        assert_eq!(client.server_reconnect().unwrap(), vec![]);

        client.apply_client(retain_insert(21, "a")).unwrap();
        assert!(matches!(client.state(), ClientState::AwaitingConfirm { .. }));
        client.apply_client(retain_insert(22, "m")).unwrap();
        assert!(matches!(
            client.state(),
            ClientState::AwaitingWithBuffer { .. }
        ));

        let effects = client.server_reconnect().unwrap();
        assert_eq!(
            effects,
            vec![ClientEffect::SendOperation {
                revision: 6,
                operation: retain_insert(21, "a"),
            }]
        );
        // Resending twice is harmless.
        assert_eq!(client.server_reconnect().unwrap(), effects);

        let effects = client.server_ack().unwrap();
        assert_eq!(
            effects,
            vec![ClientEffect::SendOperation {
                revision: 7,
                operation: retain_insert(22, "m"),
            }]
        );
    }

    #[test]
    fn test_server_ack_while_synchronized() {
        let mut client = Client::new(3);
        match client.server_ack() {
            Err(ClientError::NoPendingOperation) => {}
            result => panic!("Unexpected result: {:?}", result),
        }
        assert_eq!(client.revision(), 3);
        assert_eq!(client.state(), &ClientState::Synchronized);
    }

    #[test]
    fn test_transform_selection() {
        let selection = Selection::create_cursor(Some(3));
        let mut client = Client::new(1);
        assert_eq!(client.transform_selection(&selection), selection);

        let mut operation = TextOperation::new();
        operation.insert("ab").retain(5);
        client.apply_client(operation).unwrap();
        assert_eq!(
            client.transform_selection(&selection),
            Selection::create_cursor(Some(5))
        );

        let mut operation = TextOperation::new();
        operation.insert("c").retain(7);
        client.apply_client(operation).unwrap();
        assert_eq!(
            client.transform_selection(&selection),
            Selection::create_cursor(Some(6))
        );
    }
}
