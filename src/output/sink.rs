//! Destinations for finalised regions.
//!
//! An output hands every region it writes to an [`OutputSink`] as a
//! [`Surrogate`]; the sink never sees the pooled slot. Forward and reverse
//! frame outputs run on separate threads, so instead of sharing one sink
//! they each get a [`ChannelSink`] and a single consumer drains both
//! channels into the real destination with [`drain_to`].

use std::io::{self, Write};

use crossbeam_channel::{Receiver, Sender};

use crate::region::Surrogate;

/// Consumer of finalised regions.
pub trait OutputSink: Send {
    fn write(&mut self, surrogate: &Surrogate) -> io::Result<()>;

    /// All frames of `query_id` are finished.
    fn end_query(&mut self, query_id: u32) -> io::Result<()>;

    fn end_all(&mut self) -> io::Result<()>;

    /// Sum of the scores of every scored surrogate written so far.
    fn score(&self) -> f64;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn write(&mut self, surrogate: &Surrogate) -> io::Result<()> {
        (**self).write(surrogate)
    }

    fn end_query(&mut self, query_id: u32) -> io::Result<()> {
        (**self).end_query(query_id)
    }

    fn end_all(&mut self) -> io::Result<()> {
        (**self).end_all()
    }

    fn score(&self) -> f64 {
        (**self).score()
    }
}

#[inline]
fn scored(surrogate: &Surrogate) -> f64 {
    surrogate.score().unwrap_or(0.0)
}

/// Writes one tab-delimited record per region.
pub struct TsvSink<W: Write + Send> {
    out: W,
    records: u64,
    total: f64,
}

impl<W: Write + Send> TsvSink<W> {
    pub fn new(out: W) -> Self {
        TsvSink {
            out,
            records: 0,
            total: 0.0,
        }
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputSink for TsvSink<W> {
    fn write(&mut self, surrogate: &Surrogate) -> io::Result<()> {
        surrogate.write_tsv(&mut self.out)?;
        self.records += 1;
        self.total += scored(surrogate);
        Ok(())
    }

    fn end_query(&mut self, _query_id: u32) -> io::Result<()> {
        Ok(())
    }

    fn end_all(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn score(&self) -> f64 {
        self.total
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub surrogates: Vec<Surrogate>,
    pub ended_queries: Vec<u32>,
    pub finished: bool,
    total: f64,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for CollectingSink {
    fn write(&mut self, surrogate: &Surrogate) -> io::Result<()> {
        self.total += scored(surrogate);
        self.surrogates.push(surrogate.clone());
        Ok(())
    }

    fn end_query(&mut self, query_id: u32) -> io::Result<()> {
        self.ended_queries.push(query_id);
        Ok(())
    }

    fn end_all(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }

    fn score(&self) -> f64 {
        self.total
    }
}

/// Message stream produced by a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    Write(Surrogate),
    EndQuery(u32),
    EndAll,
}

/// Forwards sink calls over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<SinkMessage>,
    total: f64,
}

impl ChannelSink {
    pub fn new(tx: Sender<SinkMessage>) -> Self {
        ChannelSink { tx, total: 0.0 }
    }

    fn send(&self, msg: SinkMessage) -> io::Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "sink receiver dropped"))
    }
}

impl OutputSink for ChannelSink {
    fn write(&mut self, surrogate: &Surrogate) -> io::Result<()> {
        self.total += scored(surrogate);
        self.send(SinkMessage::Write(surrogate.clone()))
    }

    fn end_query(&mut self, query_id: u32) -> io::Result<()> {
        self.send(SinkMessage::EndQuery(query_id))
    }

    fn end_all(&mut self) -> io::Result<()> {
        self.send(SinkMessage::EndAll)
    }

    fn score(&self) -> f64 {
        self.total
    }
}

/// Feed messages from `producers` channel sinks into `sink`.
///
/// Returns once every producer has sent `EndAll` (or all senders are
/// gone); `sink.end_all()` is called exactly once at that point. Returns
/// the number of surrogates written.
pub fn drain_to<S: OutputSink + ?Sized>(
    rx: &Receiver<SinkMessage>,
    sink: &mut S,
    producers: usize,
) -> io::Result<u64> {
    let mut written = 0u64;
    let mut finished = 0usize;
    while finished < producers {
        match rx.recv() {
            Ok(SinkMessage::Write(s)) => {
                sink.write(&s)?;
                written += 1;
            }
            Ok(SinkMessage::EndQuery(query_id)) => sink.end_query(query_id)?,
            Ok(SinkMessage::EndAll) => finished += 1,
            Err(_) => {
                log::warn!(
                    "Sink channel closed after {} of {} producers finished",
                    finished,
                    producers
                );
                break;
            }
        }
    }
    sink.end_all()?;
    Ok(written)
}
