//! The capability set a traced connection wraps.

use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A bidirectional byte connection.
///
/// Methods take `&self` so a connection can be read and written from
/// different threads at once, the way `&TcpStream` implements both
/// [`io::Read`] and [`io::Write`].
pub trait Connection {
    /// Address type reported by [`local_addr`](Self::local_addr) and
    /// [`peer_addr`](Self::peer_addr).
    type Addr: fmt::Debug;

    /// Reads into `buf`, returning the number of bytes placed at its start.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes from `buf`, returning the number of bytes accepted.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Closes the connection.
    fn close(&self) -> io::Result<()>;

    /// Local endpoint address.
    fn local_addr(&self) -> io::Result<Self::Addr>;

    /// Remote endpoint address.
    fn peer_addr(&self) -> io::Result<Self::Addr>;

    /// Sets the read and write deadlines together. `None` clears them.
    fn set_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    /// Sets the instant after which reads fail. `None` clears it.
    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()>;

    /// Sets the instant after which writes fail. `None` clears it.
    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    type Addr = C::Addr;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        (**self).peer_addr()
    }

    fn set_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        (**self).set_deadline(deadline)
    }

    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        (**self).set_read_deadline(deadline)
    }

    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        (**self).set_write_deadline(deadline)
    }
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    type Addr = C::Addr;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        (**self).peer_addr()
    }

    fn set_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        (**self).set_deadline(deadline)
    }

    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        (**self).set_read_deadline(deadline)
    }

    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        (**self).set_write_deadline(deadline)
    }
}

/// Converts an absolute deadline into a socket timeout measured from now.
///
/// Sockets reject a zero timeout, so a deadline at or before now maps to the
/// smallest positive timeout and the next blocking call fails promptly.
pub fn timeout_until(deadline: Option<SystemTime>) -> Option<Duration> {
    let remaining = deadline?
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Some(remaining.max(Duration::from_nanos(1)))
}

impl Connection for TcpStream {
    type Addr = SocketAddr;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn close(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Self::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Self::peer_addr(self)
    }

    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.set_read_timeout(timeout_until(deadline))
    }

    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.set_write_timeout(timeout_until(deadline))
    }
}

#[cfg(unix)]
impl Connection for std::os::unix::net::UnixStream {
    type Addr = std::os::unix::net::SocketAddr;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn close(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Self::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        Self::peer_addr(self)
    }

    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.set_read_timeout(timeout_until(deadline))
    }

    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.set_write_timeout(timeout_until(deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn no_deadline_means_no_timeout() {
        assert_eq!(timeout_until(None), None);
    }

    #[test]
    fn past_deadline_maps_to_smallest_timeout() {
        let past = SystemTime::now() - Duration::from_secs(5);
        assert_eq!(timeout_until(Some(past)), Some(Duration::from_nanos(1)));
    }

    #[test]
    fn future_deadline_maps_to_remaining_time() {
        let future = SystemTime::now() + Duration::from_secs(60);
        let timeout = timeout_until(Some(future)).unwrap();
        assert!(timeout > Duration::from_secs(50));
        assert!(timeout <= Duration::from_secs(60));
    }

    #[test]
    fn tcp_stream_round_trip_through_trait() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();

        assert_eq!(Connection::write(&client, b"ping").unwrap(), 4);
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            filled += Connection::read(&server, &mut buf[filled..]).unwrap();
        }
        assert_eq!(&buf, b"ping");

        assert_eq!(
            Connection::peer_addr(&client).unwrap(),
            Connection::local_addr(&server).unwrap()
        );
        Connection::set_deadline(&client, Some(SystemTime::now() + Duration::from_secs(30)))
            .unwrap();
        Connection::set_deadline(&client, None).unwrap();
        Connection::close(&client).unwrap();
    }
}
