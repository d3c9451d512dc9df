//! File methods and properties.
//!
//! Every operation on a closed file fails with an I/O error, and files opened
//! with `"r"` reject writes. Reads go through the buffered reader; writes
//! first resynchronise the OS position with the reader's logical position.

use crate::error::{NativeError, NativeResult};
use crate::registry::{self, NativeSpec, SELF};
use core_types::Value;
use memory_manager::{FileMode, Heap, ParamInfo};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};

/// Methods of the `file` class
pub const METHODS: &[NativeSpec] = &[
    NativeSpec::new("read", read, 1, 1, &[SELF]),
    NativeSpec::new("readline", readline, 1, 1, &[SELF]),
    NativeSpec::new("readlines", readlines, 1, 1, &[SELF]),
    NativeSpec::new("write", write, 2, 2, &[SELF, ParamInfo::required("data")]),
    NativeSpec::new("writeline", writeline, 2, 2, &[SELF, ParamInfo::required("line")]),
    NativeSpec::new("writelines", writelines, 2, 2, &[SELF, ParamInfo::required("lines")]),
    NativeSpec::new(
        "seek",
        seek,
        2,
        3,
        &[SELF, ParamInfo::required("offset"), ParamInfo::optional("whence")],
    ),
    NativeSpec::new("tell", tell, 1, 1, &[SELF]),
    NativeSpec::new("flush", flush, 1, 1, &[SELF]),
    NativeSpec::new("truncate", truncate, 1, 1, &[SELF]),
    NativeSpec::new("close", close, 1, 1, &[SELF]),
];

/// Read-only properties of the `file` class
pub const PROPERTIES: &[NativeSpec] = &[
    NativeSpec::new("mode", mode, 1, 1, &[SELF]),
    NativeSpec::new("closed", closed, 1, 1, &[SELF]),
    NativeSpec::new("name", name, 1, 1, &[SELF]),
];

/// Access an open file's handle
fn handle<'h>(
    heap: &'h mut Heap,
    value: Value,
    method: &str,
) -> NativeResult<(&'h mut BufReader<File>, FileMode)> {
    let file = heap
        .as_file_mut(value)
        .ok_or_else(|| NativeError::type_error(format!("{}() must be called on a file object.", method)))?;
    let mode = file.mode;
    file.handle
        .as_mut()
        .map(|reader| (reader, mode))
        .ok_or_else(|| NativeError::io(format!("{}() called on a closed file.", method)))
}

fn readable<'h>(heap: &'h mut Heap, value: Value, method: &str) -> NativeResult<&'h mut BufReader<File>> {
    let (reader, mode) = handle(heap, value, method)?;
    if !mode.can_read() {
        return Err(NativeError::io(format!(
            "{}() called on a file opened in write mode.",
            method
        )));
    }
    Ok(reader)
}

/// The underlying file, positioned where the reader logically is
fn writable<'h>(heap: &'h mut Heap, value: Value, method: &str) -> NativeResult<&'h mut File> {
    let (reader, mode) = handle(heap, value, method)?;
    if !mode.can_write() {
        return Err(NativeError::io(format!(
            "{}() called on a file opened in read mode.",
            method
        )));
    }
    reader.seek(SeekFrom::Current(0)).map_err(io_failure)?;
    Ok(reader.get_mut())
}

fn io_failure(error: std::io::Error) -> NativeError {
    NativeError::io(format!("File operation failed: {}.", error))
}

fn read_line(reader: &mut BufReader<File>) -> NativeResult<Option<String>> {
    let mut bytes = Vec::new();
    let n = reader.read_until(b'\n', &mut bytes).map_err(io_failure)?;
    Ok((n > 0).then(|| String::from_utf8_lossy(&bytes).into_owned()))
}

/// The whole contents of an open file, read from the start
pub(crate) fn read_all(heap: &mut Heap, file: Value, method: &str) -> NativeResult<String> {
    let reader = readable(heap, file, method)?;
    reader.rewind().map_err(io_failure)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(io_failure)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

native! {
    /// The whole file, from the start
    fn read(ctx, args) {
        let text = read_all(ctx.heap, args[0], "read")?;
        Ok(registry::new_string(ctx.heap, text))
    }
}

native! {
    /// The next line with its terminator, or nil at end of file
    fn readline(ctx, args) {
        let reader = readable(ctx.heap, args[0], "readline")?;
        match read_line(reader)? {
            Some(line) => Ok(registry::new_string(ctx.heap, line)),
            None => Ok(Value::Nil),
        }
    }
}

native! {
    fn readlines(ctx, args) {
        let reader = readable(ctx.heap, args[0], "readlines")?;
        let mut lines = Vec::new();
        while let Some(line) = read_line(reader)? {
            lines.push(line);
        }
        let values = lines
            .into_iter()
            .map(|line| registry::new_string(ctx.heap, line))
            .collect();
        Ok(registry::new_list(ctx.heap, values))
    }
}

/// Write `text` at the current position
pub(crate) fn write_text(heap: &mut Heap, file: Value, text: &str, method: &str) -> NativeResult {
    writable(heap, file, method)?
        .write_all(text.as_bytes())
        .map_err(|_| NativeError::io("Failed to write to file."))?;
    Ok(Value::Bool(true))
}

native! {
    fn write(ctx, args) {
        let data = registry::string(
            ctx.heap,
            args[1],
            "write() must be called on a file object with a string argument.",
        )?;
        write_text(ctx.heap, args[0], &data, "write")
    }
}

native! {
    /// Write `line` followed by a newline
    fn writeline(ctx, args) {
        let mut line = registry::string(
            ctx.heap,
            args[1],
            "writeline() must be called on a file object with a string argument.",
        )?;
        line.push('\n');
        write_text(ctx.heap, args[0], &line, "writeline")
    }
}

native! {
    /// Write each string of a list on its own line
    fn writelines(ctx, args) {
        let lines = registry::list(
            ctx.heap,
            args[1],
            "writelines() must be called on a file object with a list argument.",
        )?;
        let mut text = String::new();
        for line in lines {
            let line = registry::string(ctx.heap, line, "writelines() requires a list of strings.")?;
            text.push_str(&line);
            text.push('\n');
        }
        write_text(ctx.heap, args[0], &text, "writelines")
    }
}

native! {
    /// Move the position; `whence` is 0 (start), 1 (current) or 2 (end)
    fn seek(ctx, args) {
        let offset = registry::integer(args[1], "seek() expects a numeric offset.")?;
        let whence = match args.get(2) {
            Some(w) => registry::integer(*w, "seek() requires a numeric whence.")?,
            None => 0,
        };
        let target = match whence {
            0 if offset >= 0 => SeekFrom::Start(offset as u64),
            0 => return Err(NativeError::io("seek() offset must not be negative.")),
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            _ => return Err(NativeError::type_error("seek() whence must be 0, 1 or 2.")),
        };
        let (reader, _) = handle(ctx.heap, args[0], "seek")?;
        reader.seek(target).map_err(io_failure)?;
        Ok(Value::Nil)
    }
}

native! {
    fn tell(ctx, args) {
        let (reader, _) = handle(ctx.heap, args[0], "tell")?;
        let position = reader.stream_position().map_err(io_failure)?;
        Ok(Value::Number(position as f64))
    }
}

native! {
    fn flush(ctx, args) {
        let (reader, _) = handle(ctx.heap, args[0], "flush")?;
        reader
            .get_mut()
            .flush()
            .map_err(|_| NativeError::io("Failed to flush file."))?;
        Ok(Value::Nil)
    }
}

native! {
    /// Cut the file at the current position
    fn truncate(ctx, args) {
        let file = writable(ctx.heap, args[0], "truncate")?;
        let position = file.stream_position().map_err(io_failure)?;
        file.set_len(position)
            .map_err(|_| NativeError::io("Failed to truncate file."))?;
        Ok(Value::Nil)
    }
}

native! {
    /// Release the OS handle; closing twice is an error
    fn close(ctx, args) {
        let file = ctx
            .heap
            .as_file_mut(args[0])
            .ok_or_else(|| NativeError::type_error("close() must be called on a file object."))?;
        match file.handle.take() {
            Some(mut reader) => {
                reader.get_mut().flush().map_err(io_failure)?;
                Ok(Value::Nil)
            }
            None => Err(NativeError::io("close() called on a closed file.")),
        }
    }
}

native! {
    fn mode(ctx, args) {
        let file = ctx
            .heap
            .as_file_mut(args[0])
            .ok_or_else(|| NativeError::type_error("mode must be called on a file object."))?;
        let mode = file.mode.as_str();
        Ok(ctx.heap.string_value(mode))
    }
}

native! {
    fn closed(ctx, args) {
        let file = ctx
            .heap
            .as_file_mut(args[0])
            .ok_or_else(|| NativeError::type_error("closed must be called on a file object."))?;
        Ok(Value::Bool(file.is_closed()))
    }
}

native! {
    /// The path the file was opened with
    fn name(ctx, args) {
        let file = ctx
            .heap
            .as_file_mut(args[0])
            .ok_or_else(|| NativeError::type_error("name must be called on a file object."))?;
        Ok(Value::Obj(file.path))
    }
}
