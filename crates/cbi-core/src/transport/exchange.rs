//! One in-flight request driven through a private curl multi handle.
//!
//! Every step (`perform`, `wait` bounded by a short slice) is non-blocking or
//! short, so the abort token is observed promptly. The body is pulled: reading
//! from the exchange pumps curl until bytes are buffered or the transfer ends.
//! Dropping the exchange detaches the handle and closes the connection.

use std::io::{self, Read};

use curl::easy::Easy2;
use curl::multi::{Easy2Handle, Multi};

use crate::control::{AbortToken, POLL_SLICE};
use crate::error::TransportError;
use crate::result::ResponseHead;

use super::collector::{Collector, LOW_WATER};
use super::parse::parse_head;

pub(super) struct Exchange {
    // Declared before `multi` so the handle is detached first on drop.
    handle: Easy2Handle<Collector>,
    multi: Multi,
    done: Option<Result<(), curl::Error>>,
    abort: AbortToken,
}

impl Exchange {
    pub(super) fn start(easy: Easy2<Collector>, abort: AbortToken) -> Result<Self, TransportError> {
        let multi = Multi::new();
        let handle = multi.add2(easy)?;
        Ok(Self {
            handle,
            multi,
            done: None,
            abort,
        })
    }

    /// Drive the transfer until the final response headers are in.
    pub(super) fn await_headers(&mut self) -> Result<ResponseHead, TransportError> {
        loop {
            if self.abort.is_aborted() {
                return Err(TransportError::Aborted);
            }
            self.pump()?;
            let collector = self.handle.get_ref();
            if collector.headers_done {
                return parse_head(&collector.response_headers).ok_or(TransportError::NoResponse);
            }
            match &self.done {
                Some(Err(e)) => return Err(TransportError::Curl(e.clone())),
                Some(Ok(())) => return Err(TransportError::NoResponse),
                None => self.wait()?,
            }
        }
    }

    fn pump(&mut self) -> Result<(), TransportError> {
        self.multi.perform()?;
        let handle = &self.handle;
        let mut finished = None;
        self.multi.messages(|msg| {
            if let Some(res) = msg.result_for2(handle) {
                finished = Some(res);
            }
        });
        if finished.is_some() {
            self.done = finished;
        }
        Ok(())
    }

    fn wait(&self) -> Result<(), TransportError> {
        self.multi.wait(&mut [], POLL_SLICE)?;
        Ok(())
    }

    fn resume_if_drained(&mut self) -> io::Result<()> {
        let collector = self.handle.get_mut();
        if collector.paused && collector.body.len() < LOW_WATER {
            collector.paused = false;
            self.handle.unpause_write().map_err(to_io)?;
        }
        Ok(())
    }
}

impl Read for Exchange {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.handle.get_mut().take(buf);
            if n > 0 {
                self.resume_if_drained()?;
                return Ok(n);
            }
            match &self.done {
                Some(Ok(())) => return Ok(0),
                Some(Err(e)) => return Err(to_io(e.clone())),
                None => {}
            }
            if self.abort.is_aborted() {
                return Err(to_io(TransportError::Aborted));
            }
            self.resume_if_drained()?;
            self.pump().map_err(to_io)?;
            if self.handle.get_ref().body.is_empty() && self.done.is_none() {
                self.wait().map_err(to_io)?;
            }
        }
    }
}

fn to_io<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::Other, e)
}
