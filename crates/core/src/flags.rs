//! 심볼 테이블 — 연산 플래그, 오픈 플래그, 파일 타입, 프로토콜
//!
//! 플랫 레코드의 숫자 슬롯을 정책 언어가 다루는 심볼 문자열로 변환하는
//! 테이블입니다. 연산 플래그의 의미는 레코드 종류에 따라 달라집니다.

use crate::schema::RecordKind;

/// 연산 플래그 비트
pub mod op {
    pub const CLONE: i64 = 1 << 0;
    pub const EXEC: i64 = 1 << 1;
    pub const EXIT: i64 = 1 << 2;
    pub const SETUID: i64 = 1 << 3;
    pub const SETNS: i64 = 1 << 4;
    pub const ACCEPT: i64 = 1 << 5;
    pub const CONNECT: i64 = 1 << 6;
    pub const OPEN: i64 = 1 << 7;
    pub const READ: i64 = 1 << 8;
    pub const WRITE: i64 = 1 << 9;
    pub const CLOSE: i64 = 1 << 10;
    pub const TRUNCATE: i64 = 1 << 11;
    pub const SHUTDOWN: i64 = 1 << 12;
    pub const MMAP: i64 = 1 << 13;
    pub const DIGEST: i64 = 1 << 14;
    pub const MKDIR: i64 = 1 << 15;
    pub const RMDIR: i64 = 1 << 16;
    pub const LINK: i64 = 1 << 17;
    pub const UNLINK: i64 = 1 << 18;
    pub const SYMLINK: i64 = 1 << 19;
    pub const RENAME: i64 = 1 << 20;
}

/// open(2) 플래그 비트
pub mod open {
    pub const RDONLY: i64 = 1 << 0;
    pub const WRONLY: i64 = 1 << 1;
    pub const CREAT: i64 = 1 << 2;
    pub const APPEND: i64 = 1 << 3;
    pub const DSYNC: i64 = 1 << 4;
    pub const EXCL: i64 = 1 << 5;
    pub const NONBLOCK: i64 = 1 << 6;
    pub const SYNC: i64 = 1 << 7;
    pub const TRUNC: i64 = 1 << 8;
    pub const DIRECT: i64 = 1 << 9;
    pub const DIRECTORY: i64 = 1 << 10;
    pub const LARGEFILE: i64 = 1 << 11;
    pub const CLOEXEC: i64 = 1 << 12;
}

/// 플래그 비트마스크를 심볼 이름 목록으로 변환합니다.
///
/// 같은 비트라도 레코드 종류에 따라 이름이 다릅니다. 예를 들어 READ/WRITE
/// 비트는 파일 플로우에서는 `READ`/`WRITE`, 네트워크 플로우에서는
/// `RECV`/`SEND`로 읽힙니다.
pub fn op_flag_names(flags: i64, kind: Option<RecordKind>) -> Vec<&'static str> {
    let mut names = Vec::new();
    match kind {
        Some(RecordKind::ProcEvt) => {
            for (bit, name) in [
                (op::CLONE, "CLONE"),
                (op::EXEC, "EXEC"),
                (op::EXIT, "EXIT"),
                (op::SETUID, "SETUID"),
                (op::SETNS, "SETNS"),
            ] {
                if flags & bit != 0 {
                    names.push(name);
                }
            }
        }
        Some(RecordKind::FileEvt) => {
            for (bit, name) in [
                (op::MKDIR, "MKDIR"),
                (op::RMDIR, "RMDIR"),
                (op::LINK, "LINK"),
                (op::UNLINK, "UNLINK"),
                (op::SYMLINK, "SYMLINK"),
                (op::RENAME, "RENAME"),
            ] {
                if flags & bit != 0 {
                    names.push(name);
                }
            }
        }
        Some(RecordKind::FileFlow) => {
            for (bit, name) in [
                (op::OPEN, "OPEN"),
                (op::READ, "READ"),
                (op::WRITE, "WRITE"),
                (op::CLOSE, "CLOSE"),
                (op::TRUNCATE, "TRUNCATE"),
                (op::MMAP, "MMAP"),
                (op::DIGEST, "DIGEST"),
            ] {
                if flags & bit != 0 {
                    names.push(name);
                }
            }
        }
        Some(RecordKind::NetFlow) => {
            for (bit, name) in [
                (op::ACCEPT, "ACCEPT"),
                (op::CONNECT, "CONNECT"),
                (op::READ, "RECV"),
                (op::WRITE, "SEND"),
                (op::CLOSE, "CLOSE"),
                (op::SHUTDOWN, "SHUTDOWN"),
            ] {
                if flags & bit != 0 {
                    names.push(name);
                }
            }
        }
        _ => {}
    }
    names
}

/// 플래그 비트마스크를 시스템 콜 계열 이벤트 이름으로 변환합니다 (`evt.type`).
pub fn evt_type_names(flags: i64, kind: Option<RecordKind>) -> Vec<&'static str> {
    let mut names = Vec::new();
    let table: &[(i64, &'static str)] = match kind {
        Some(RecordKind::ProcEvt) => &[
            (op::CLONE, "clone"),
            (op::EXEC, "execve"),
            (op::EXIT, "exit"),
            (op::SETUID, "setuid"),
            (op::SETNS, "setns"),
        ],
        Some(RecordKind::FileEvt) => &[
            (op::MKDIR, "mkdir"),
            (op::RMDIR, "rmdir"),
            (op::LINK, "link"),
            (op::UNLINK, "unlink"),
            (op::SYMLINK, "symlink"),
            (op::RENAME, "rename"),
        ],
        Some(RecordKind::FileFlow) => &[
            (op::OPEN, "open"),
            (op::READ, "read"),
            (op::WRITE, "write"),
            (op::CLOSE, "close"),
            (op::TRUNCATE, "truncate"),
            (op::MMAP, "mmap"),
        ],
        Some(RecordKind::NetFlow) => &[
            (op::ACCEPT, "accept"),
            (op::CONNECT, "connect"),
            (op::READ, "recvmsg"),
            (op::WRITE, "sendmsg"),
            (op::CLOSE, "close"),
            (op::SHUTDOWN, "shutdown"),
        ],
        _ => &[],
    };
    for (bit, name) in table {
        if flags & bit != 0 {
            names.push(*name);
        }
    }
    names
}

/// open 플래그 비트마스크를 심볼 이름 목록으로 변환합니다.
pub fn open_flag_names(flags: i64) -> Vec<&'static str> {
    let mut names = Vec::new();
    for (bit, name) in [
        (open::RDONLY, "RDONLY"),
        (open::WRONLY, "WRONLY"),
        (open::CREAT, "CREAT"),
        (open::APPEND, "APPEND"),
        (open::DSYNC, "DSYNC"),
        (open::EXCL, "EXCL"),
        (open::NONBLOCK, "NONBLOCK"),
        (open::SYNC, "SYNC"),
        (open::TRUNC, "TRUNC"),
        (open::DIRECT, "DIRECT"),
        (open::DIRECTORY, "DIRECTORY"),
        (open::LARGEFILE, "LARGEFILE"),
        (open::CLOEXEC, "CLOEXEC"),
    ] {
        if flags & bit != 0 {
            names.push(name);
        }
    }
    names
}

/// 읽기 모드로 열렸는지 검사합니다.
#[inline]
pub fn is_open_read(flags: i64) -> bool {
    flags & open::RDONLY != 0
}

/// 쓰기 모드로 열렸는지 검사합니다.
#[inline]
pub fn is_open_write(flags: i64) -> bool {
    flags & open::WRONLY != 0
}

/// 파일 리소스 타입 코드를 타입 문자로 변환합니다.
///
/// 코드는 타입 문자의 ASCII 값입니다. 알 수 없는 코드는 `'o'`(other)로
/// 변환됩니다.
pub fn file_type_char(restype: i64) -> char {
    match u8::try_from(restype).map(char::from) {
        Ok(c @ ('f' | '4' | '6' | 'u' | 'p' | 'e' | 's' | 'l' | 'i')) => c,
        _ => 'o',
    }
}

/// L4 프로토콜 번호를 이름으로 변환합니다.
pub fn proto_name(proto: i64) -> &'static str {
    match proto {
        1 => "icmp",
        6 => "tcp",
        17 => "udp",
        132 => "sctp",
        _ => "unknown",
    }
}

/// 컨테이너 타입 코드를 이름으로 변환합니다.
pub fn container_type_name(code: i64) -> &'static str {
    match code {
        0 => "docker",
        1 => "lxc",
        2 => "libvirt_lxc",
        3 => "mesos",
        4 => "rkt",
        5 => "custom",
        6 => "cri",
        7 => "containerd",
        8 => "crio",
        9 => "bpm",
        10 => "host",
        _ => "unknown",
    }
}

/// int 슬롯에 담긴 IPv4 주소를 점분리 표기로 변환합니다.
///
/// 첫 옥텟이 최하위 바이트에 담기는 수집기 인코딩을 따릅니다.
pub fn ipv4_str(value: i64) -> String {
    let v = value as u32;
    format!(
        "{}.{}.{}.{}",
        v & 0xff,
        (v >> 8) & 0xff,
        (v >> 16) & 0xff,
        (v >> 24) & 0xff
    )
}
