use std::net::TcpStream;
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};
use native_tls::{TlsConnector, TlsStream};

use crate::domain::account::MailboxIdentity;
use crate::domain::email::{EmailBodies, EmailHead};
use crate::mail::decoders::imap_search_date;
use crate::mail::envelope::EnvelopeRecord;
use crate::mail::parts::decompose;
use crate::mail::{EmailCursor, MailAccount, MailError, parse_uid};

type ImapSession = imap::Session<TlsStream<TcpStream>>;

const IMAP_PORT: u16 = 993;
const INBOX: &str = "INBOX";
const RECENT_WINDOW_HOURS: i64 = 24;
const CLOSE_POLL: Duration = Duration::from_millis(50);

/// SASL PLAIN where the mailbox is both authorization and authentication
/// identity.
struct PlainAuthenticator<'a> {
    identity: &'a str,
    password: &'a str,
}

impl imap::Authenticator for PlainAuthenticator<'_> {
    type Response = String;
    fn process(&self, _challenge: &[u8]) -> Self::Response {
        format!("{0}\x00{0}\x00{1}", self.identity, self.password)
    }
}

/// The parts of a FETCH reply needed to tell solicited replies from
/// unsolicited ones.
trait FetchReply {
    fn sequence(&self) -> u32;
    fn uid(&self) -> Option<u32>;
}

impl FetchReply for imap::types::Fetch {
    fn sequence(&self) -> u32 {
        self.message
    }

    fn uid(&self) -> Option<u32> {
        self.uid
    }
}

/// What a FETCH asked for. Servers may interleave unsolicited FETCH
/// responses for other messages, which must not be taken as answers.
enum Requested<'a> {
    /// Sorted sequence numbers.
    Sequences(&'a [u32]),
    Uid(u32),
}

impl Requested<'_> {
    fn admits(&self, reply: &impl FetchReply) -> bool {
        match *self {
            Requested::Sequences(seqs) => seqs.binary_search(&reply.sequence()).is_ok(),
            Requested::Uid(uid) => reply.uid() == Some(uid),
        }
    }
}

/// A single IMAP account backed by one lazily opened, read-only INBOX
/// session.
///
/// The session lives behind a mutex: every operation holds the lock from
/// establishment through its last command, so concurrent requests queue up
/// instead of interleaving on the wire.
pub struct ImapAccount {
    identity: MailboxIdentity,
    session: Mutex<Option<ImapSession>>,
}

impl ImapAccount {
    pub fn new(identity: MailboxIdentity) -> Self {
        Self {
            identity,
            session: Mutex::new(None),
        }
    }

    fn establish(&self) -> Result<ImapSession, MailError> {
        let MailboxIdentity {
            mailbox,
            host,
            password,
        } = &self.identity;

        let dial = |reason: String| MailError::Connection {
            host: host.clone(),
            reason,
        };
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| dial(e.to_string()))?;
        let client = imap::connect((host.as_str(), IMAP_PORT), host.as_str(), &tls)
            .map_err(|e| dial(e.to_string()))?;

        let auth = PlainAuthenticator {
            identity: mailbox,
            password,
        };
        let mut session =
            client
                .authenticate("PLAIN", &auth)
                .map_err(|(e, _client)| MailError::Authentication {
                    mailbox: mailbox.clone(),
                    host: host.clone(),
                    reason: e.to_string(),
                })?;

        if let Err(e) = session.examine(INBOX) {
            if let Err(logout) = session.logout() {
                debug!("logout after failed select: {logout}");
            }
            return Err(MailError::MailboxSelection {
                mailbox: INBOX.to_string(),
                reason: e.to_string(),
            });
        }

        info!("IMAP session established for {mailbox}@{host}");
        Ok(session)
    }

    fn lock(&self) -> MutexGuard<'_, Option<ImapSession>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // a panic mid-command leaves the wire state unknown
                let mut guard = poisoned.into_inner();
                *guard = None;
                guard
            }
        }
    }

    /// Runs `op` against a live session, opening one first if needed.
    ///
    /// A transport failure discards the session so the next call dials
    /// again.
    fn with_session<T>(
        &self,
        op: impl FnOnce(&mut ImapSession) -> Result<T, MailError>,
    ) -> Result<T, MailError> {
        let mut guard = self.lock();
        let session = match guard.take() {
            Some(session) => session,
            None => self.establish()?,
        };
        let session = guard.insert(session);

        let outcome = op(session);
        if let Err(err) = &outcome
            && err.is_connection_lost()
        {
            warn!(
                "dropping IMAP session for {}@{}: {err}",
                self.identity.mailbox, self.identity.host
            );
            *guard = None;
        }
        outcome
    }

    /// Logs out of the live session, if any, giving up after `grace`.
    ///
    /// The grace period also covers waiting for an in-flight operation to
    /// release the session.
    pub fn close(&self, grace: Duration) -> Result<(), MailError> {
        let deadline = Instant::now() + grace;
        let session = loop {
            match self.session.try_lock() {
                Ok(mut guard) => break guard.take(),
                Err(TryLockError::Poisoned(poisoned)) => break poisoned.into_inner().take(),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(MailError::CloseTimeout(grace));
                    }
                    thread::sleep(CLOSE_POLL);
                }
            }
        };
        let Some(mut session) = session else {
            debug!("no IMAP session to close");
            return Ok(());
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(session.logout().map_err(|e| e.to_string()));
        });

        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Ok(())) => {
                info!(
                    "IMAP session closed for {}@{}",
                    self.identity.mailbox, self.identity.host
                );
                Ok(())
            }
            Ok(Err(reason)) => Err(MailError::Logout(reason)),
            Err(_) => Err(MailError::CloseTimeout(grace)),
        }
    }
}

impl MailAccount for ImapAccount {
    fn mailbox(&self) -> &str {
        &self.identity.mailbox
    }

    fn host(&self) -> &str {
        &self.identity.host
    }

    fn list_emails(&self) -> Result<EmailCursor, MailError> {
        let since = imap_search_date(Utc::now() - chrono::Duration::hours(RECENT_WINDOW_HOURS));
        let query = format!("SINCE {since}");

        let records = self.with_session(|session| {
            let found = session
                .search(&query)
                .map_err(MailError::command(MailError::Search))?;
            if found.is_empty() {
                return Ok(Vec::new());
            }

            let mut seqs: Vec<u32> = found.into_iter().collect();
            seqs.sort_unstable();
            let sequence_set = seqs
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");

            let fetches = session
                .fetch(&sequence_set, "ENVELOPE")
                .map_err(MailError::command(MailError::Fetch))?;
            let wanted = Requested::Sequences(&seqs);
            Ok(fetches
                .iter()
                .filter(|f| wanted.admits(*f))
                .map(|f| EnvelopeRecord::from_fetch(f.message.to_string(), f))
                .collect::<Vec<_>>())
        })?;

        if records.is_empty() {
            debug!("nothing received since {since}");
            return Ok(EmailCursor::empty());
        }
        debug!("listing {} message(s) since {since}", records.len());
        Ok(EmailCursor::new(
            records.into_iter().map(EnvelopeRecord::into_summary),
        ))
    }

    fn retrieve_email_head(&self, id: &str) -> Result<EmailHead, MailError> {
        let uid = parse_uid(id)?;

        let record = self.with_session(|session| {
            let fetches = session
                .uid_fetch(uid.to_string(), "(UID ENVELOPE)")
                .map_err(MailError::command(MailError::Fetch))?;
            let wanted = Requested::Uid(uid);
            Ok(fetches
                .iter()
                .find(|f| wanted.admits(*f))
                .map(|f| EnvelopeRecord::from_fetch(id.to_string(), f)))
        })?;

        record.ok_or(MailError::NotFound(uid))?.into_head()
    }

    fn retrieve_email_body(&self, id: &str) -> Result<EmailBodies, MailError> {
        let uid = parse_uid(id)?;

        let literals = self.with_session(|session| {
            let fetches = session
                .uid_fetch(uid.to_string(), "(UID ENVELOPE BODY.PEEK[])")
                .map_err(MailError::command(MailError::Fetch))?;
            let wanted = Requested::Uid(uid);
            Ok(fetches
                .iter()
                .filter(|f| wanted.admits(*f))
                .map(|f| f.body().map(<[u8]>::to_vec))
                .collect::<Vec<_>>())
        })?;

        if literals.is_empty() {
            return Err(MailError::NotFound(uid));
        }

        let mut bodies = EmailBodies::new();
        for raw in literals.iter().flatten() {
            decompose(raw, &mut bodies)?;
        }
        debug!("UID {uid}: {} inline part(s)", bodies.len());
        Ok(bodies)
    }
}
