//! The production [XConn] backed by `x11rb`: atom interning up front, `randr`
//! for monitor geometry, reply errors folded into [crate::Error].
use crate::bindings::{KeyCombo, Modifier, MouseButton, MouseCombo};
use crate::geometry::{Point, Rect};
use crate::x::{Struts, WindowClass, XConn, XEvent, Xid};
use crate::{Error, Result};

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use strum::{AsRefStr, EnumIter, IntoEnumIterator};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
    AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageData, ClientMessageEvent,
    ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, EventMask, GrabMode, InputFocus,
    ModMask, PropMode, Window, WindowClass as X11WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

/// EWMH/ICCCM atom names this backend needs resolved at connect time, interned
/// once at connect via `Atom::iter().map(intern_atom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[allow(non_camel_case_types)]
enum Atom {
    WM_PROTOCOLS,
    WM_DELETE_WINDOW,
    #[strum(serialize = "_NET_WM_NAME")]
    NetWmName,
    #[strum(serialize = "_NET_WM_STRUT_PARTIAL")]
    NetWmStrutPartial,
    #[strum(serialize = "_NET_WM_STRUT")]
    NetWmStrut,
    #[strum(serialize = "_NET_SUPPORTED")]
    NetSupported,
    #[strum(serialize = "_NET_NUMBER_OF_DESKTOPS")]
    NetNumberOfDesktops,
    #[strum(serialize = "_NET_CURRENT_DESKTOP")]
    NetCurrentDesktop,
    #[strum(serialize = "_NET_DESKTOP_NAMES")]
    NetDesktopNames,
    #[strum(serialize = "_NET_CLIENT_LIST")]
    NetClientList,
    #[strum(serialize = "_NET_ACTIVE_WINDOW")]
    NetActiveWindow,
    #[strum(serialize = "UTF8_STRING")]
    Utf8String,
}

fn modmask(mods: &[Modifier]) -> u16 {
    let mut mask = 0u16;
    for m in mods {
        mask |= match m {
            Modifier::Shift => u16::from(ModMask::SHIFT),
            Modifier::Ctrl => u16::from(ModMask::CONTROL),
            Modifier::Mod1 => u16::from(ModMask::M1),
            Modifier::Mod2 => u16::from(ModMask::M2),
            Modifier::Mod3 => u16::from(ModMask::M3),
            Modifier::Mod4 => u16::from(ModMask::M4),
        };
    }
    mask
}

fn mods_from_state(state: u16) -> Vec<Modifier> {
    let mut mods = Vec::new();
    let bit = |m: ModMask| (state & u16::from(m)) != 0;
    if bit(ModMask::SHIFT) {
        mods.push(Modifier::Shift);
    }
    if bit(ModMask::CONTROL) {
        mods.push(Modifier::Ctrl);
    }
    if bit(ModMask::M1) {
        mods.push(Modifier::Mod1);
    }
    if bit(ModMask::M2) {
        mods.push(Modifier::Mod2);
    }
    if bit(ModMask::M3) {
        mods.push(Modifier::Mod3);
    }
    if bit(ModMask::M4) {
        mods.push(Modifier::Mod4);
    }
    mods.sort();
    mods
}

fn button_number(b: MouseButton) -> u8 {
    match b {
        MouseButton::Left => 1,
        MouseButton::Middle => 2,
        MouseButton::Right => 3,
    }
}

fn button_from_number(n: u8) -> Option<MouseButton> {
    match n {
        1 => Some(MouseButton::Left),
        2 => Some(MouseButton::Middle),
        3 => Some(MouseButton::Right),
        _ => None,
    }
}

/// A live connection to an X server via `x11rb`.
pub struct X11rbConn {
    conn: RustConnection,
    root: Window,
    atoms: HashMap<Atom, u32>,
    // Mutex rather than RefCell: the reactor shares this connection with its
    // event-pump thread behind an Arc (spec.md §5), so interior mutability has
    // to be thread-safe too.
    keysym_cache: Mutex<HashMap<String, Option<u8>>>,
}

impl X11rbConn {
    /// Connect to the X server named by `$DISPLAY` and perform the startup
    /// handshake: resolve atoms, select root-window substructure redirect,
    /// enable `randr` monitor-change notifications (spec.md §4.1).
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        let atom_cookies = Atom::iter()
            .map(|a| Ok((a, conn.intern_atom(false, a.as_ref().as_bytes())?)))
            .collect::<Result<Vec<_>>>()?;
        let atoms = atom_cookies
            .into_iter()
            .map(|(a, cookie)| Ok((a, cookie.reply()?.atom)))
            .collect::<Result<HashMap<_, _>>>()?;

        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?;

        use x11rb::protocol::randr::NotifyMask;
        conn.randr_select_input(
            root,
            NotifyMask::SCREEN_CHANGE | NotifyMask::CRTC_CHANGE | NotifyMask::OUTPUT_CHANGE,
        )?;

        conn.flush()?;

        Ok(Self {
            conn,
            root,
            atoms,
            keysym_cache: Mutex::new(HashMap::new()),
        })
    }

    fn atom(&self, a: Atom) -> u32 {
        *self.atoms.get(&a).expect("all atoms interned at connect")
    }

    fn keycode_for_key_name(&self, key: &str) -> Option<u8> {
        if let Some(cached) = self.keysym_cache.lock().unwrap().get(key) {
            return *cached;
        }

        let target = crate::keysyms::XKeySym::from_str(key).ok()?.value();
        let setup = self.conn.setup();
        let min_kc = setup.min_keycode;
        let max_kc = setup.max_keycode;

        let mapping = self
            .conn
            .get_keyboard_mapping(min_kc, max_kc - min_kc + 1)
            .ok()?
            .reply()
            .ok()?;

        let per = mapping.keysyms_per_keycode as usize;
        let found = mapping
            .keysyms
            .chunks(per.max(1))
            .enumerate()
            .find(|(_, syms)| syms.contains(&target))
            .map(|(i, _)| min_kc + i as u8);

        self.keysym_cache
            .lock()
            .unwrap()
            .insert(key.to_string(), found);
        found
    }

    fn read_text_property(&self, win: Window, atom: u32) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, win, atom, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        if reply.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }

    /// Read `left, right, top, bottom` off the front of a CARDINAL-array strut
    /// property (`_NET_WM_STRUT_PARTIAL`'s twelve values and the legacy
    /// `_NET_WM_STRUT`'s four share this same leading order).
    fn read_cardinal_struts(&self, id: Xid, atom: Atom, length: u32) -> Result<Option<Struts>> {
        let reply = self
            .conn
            .get_property(false, id.0, self.atom(atom), AtomEnum::CARDINAL, 0, length)?
            .reply()?;

        let values: Vec<u32> = reply.value32().map(|it| it.collect()).unwrap_or_default();
        if values.len() < 4 {
            return Ok(None);
        }
        Ok(Some(Struts {
            left: values[0],
            right: values[1],
            top: values[2],
            bottom: values[3],
        }))
    }
}

impl XConn for X11rbConn {
    fn root(&self) -> Xid {
        Xid(self.root)
    }

    fn screen_details(&self) -> Result<Vec<Rect>> {
        let resources = self.conn.randr_get_screen_resources(self.root)?.reply()?;
        let mut rects = Vec::new();
        for crtc in resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)?
                .reply()?;
            if info.width == 0 || info.height == 0 {
                continue;
            }
            rects.push(Rect::new(
                info.x as i32,
                info.y as i32,
                info.width as u32,
                info.height as u32,
            ));
        }
        if rects.is_empty() {
            let screen = &self.conn.setup().roots[0];
            rects.push(Rect::new(
                0,
                0,
                screen.width_in_pixels as u32,
                screen.height_in_pixels as u32,
            ));
        }
        Ok(rects)
    }

    fn grab_key(&self, combo: &KeyCombo) -> Result<()> {
        let Some(code) = self.keycode_for_key_name(&combo.key) else {
            return Ok(());
        };
        self.conn.grab_key(
            true,
            self.root,
            ModMask::from(modmask(&combo.modifiers)),
            code,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        Ok(())
    }

    fn grab_button(&self, combo: &MouseCombo) -> Result<()> {
        self.conn.grab_button(
            true,
            self.root,
            (EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE).into(),
            GrabMode::ASYNC,
            GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            ButtonIndex::from(button_number(combo.button)),
            ModMask::from(modmask(&combo.modifiers)),
        )?;
        Ok(())
    }

    fn ungrab_all(&self) -> Result<()> {
        self.conn
            .ungrab_key(0u8, self.root, ModMask::ANY.into())?;
        self.conn
            .ungrab_button(0u8.into(), self.root, ModMask::ANY.into())?;
        Ok(())
    }

    fn next_event(&self) -> Result<XEvent> {
        loop {
            let event = self
                .conn
                .wait_for_event()
                .map_err(|e| Error::ConnectionLost(e.to_string()))?;

            match event {
                Event::MapRequest(e) => return Ok(XEvent::MapRequest(Xid(e.window))),
                Event::UnmapNotify(e) => return Ok(XEvent::UnmapNotify(Xid(e.window))),
                Event::DestroyNotify(e) => return Ok(XEvent::DestroyNotify(Xid(e.window))),
                Event::ConfigureRequest(e) => {
                    return Ok(XEvent::ConfigureRequest(Xid(e.window)))
                }
                Event::PropertyNotify(e) => return Ok(XEvent::PropertyNotify(Xid(e.window))),
                Event::RandrScreenChangeNotify(_) => return Ok(XEvent::ScreenChange),
                Event::KeyPress(e) => {
                    // Keycode -> key name resolution mirrors keycode_for_key_name in
                    // reverse; unresolvable keycodes (rare, layout-dependent extra
                    // keys) are swallowed and we wait for the next event.
                    if let Some(name) = self.key_name_for_keycode(e.detail) {
                        return Ok(XEvent::KeyPress(KeyCombo {
                            modifiers: mods_from_state(e.state.into()),
                            key: name,
                        }));
                    }
                }
                Event::ButtonPress(e) => {
                    if let Some(button) = button_from_number(e.detail) {
                        return Ok(XEvent::ButtonPress(
                            MouseCombo {
                                modifiers: mods_from_state(e.state.into()),
                                button,
                            },
                            Point::new(e.root_x as i32, e.root_y as i32),
                        ));
                    }
                }
                _ => continue,
            }
        }
    }

    fn flush(&self) {
        let _ = self.conn.flush();
    }

    fn reparent(&self, child: Xid, parent: Xid, x: i32, y: i32) -> Result<()> {
        self.conn
            .reparent_window(child.0, parent.0, x as i16, y as i16)?;
        Ok(())
    }

    fn create_frame(&self, geometry: Rect) -> Result<Xid> {
        let id = self.conn.generate_id()?;
        let aux = CreateWindowAux::new()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY)
            .background_pixel(self.conn.setup().roots[0].black_pixel);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            id,
            self.root,
            geometry.x as i16,
            geometry.y as i16,
            geometry.w as u16,
            geometry.h as u16,
            0,
            X11WindowClass::INPUT_OUTPUT,
            0,
            &aux,
        )?;
        Ok(Xid(id))
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.conn.destroy_window(id.0)?;
        Ok(())
    }

    fn configure(&self, id: Xid, geometry: Rect) -> Result<()> {
        let aux = ConfigureWindowAux::new()
            .x(geometry.x)
            .y(geometry.y)
            .width(geometry.w)
            .height(geometry.h);
        self.conn.configure_window(id.0, &aux)?;
        Ok(())
    }

    fn set_border(&self, id: Xid, width: u32, color_pixel: u32) -> Result<()> {
        self.conn
            .configure_window(id.0, &ConfigureWindowAux::new().border_width(width))?;
        self.conn.change_window_attributes(
            id.0,
            &ChangeWindowAttributesAux::new().border_pixel(color_pixel),
        )?;
        Ok(())
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.conn.map_window(id.0)?;
        Ok(())
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.conn.unmap_window(id.0)?;
        Ok(())
    }

    fn close(&self, id: Xid) -> Result<()> {
        let protocols = self.read_text_property(id.0, self.atom(Atom::WM_PROTOCOLS));
        let supports_delete = protocols
            .ok()
            .flatten()
            .map(|p| p.contains("WM_DELETE_WINDOW"))
            .unwrap_or(false);

        if supports_delete {
            let event = ClientMessageEvent::new(
                32,
                id.0,
                self.atom(Atom::WM_PROTOCOLS),
                ClientMessageData::from([self.atom(Atom::WM_DELETE_WINDOW), 0, 0, 0, 0]),
            );
            self.conn
                .send_event(false, id.0, EventMask::NO_EVENT, event)?;
        } else {
            self.conn.kill_client(id.0)?;
        }
        Ok(())
    }

    fn focus(&self, id: Xid) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, id.0, x11rb::CURRENT_TIME)?;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atom(Atom::NetActiveWindow),
            AtomEnum::WINDOW,
            &[id.0],
        )?;
        Ok(())
    }

    fn query_class_and_title(&self, id: Xid) -> Result<WindowClass> {
        let class = self
            .read_text_property(id.0, AtomEnum::WM_CLASS.into())?
            .and_then(|s| s.split('\0').nth(1).map(str::to_string));
        let title = self
            .read_text_property(id.0, self.atom(Atom::NetWmName))?
            .or(self.read_text_property(id.0, AtomEnum::WM_NAME.into())?);
        Ok(WindowClass { class, title })
    }

    fn read_struts(&self, id: Xid) -> Result<Option<Struts>> {
        if let Some(struts) = self.read_cardinal_struts(id, Atom::NetWmStrutPartial, 12)? {
            return Ok(Some(struts));
        }
        // Older bars only ever set the plain, four-value `_NET_WM_STRUT`
        // (SPEC_FULL.md §11.1 "falling back to _NET_WM_STRUT").
        self.read_cardinal_struts(id, Atom::NetWmStrut, 4)
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        Ok(tree.children.into_iter().map(Xid).collect())
    }

    fn set_ewmh_name(&self, name: &str) -> Result<()> {
        self.conn.change_property8(
            PropMode::REPLACE,
            self.root,
            self.atom(Atom::NetWmName),
            self.atom(Atom::Utf8String),
            name.as_bytes(),
        )?;
        Ok(())
    }

    fn set_ewmh_desktop_hints(
        &self,
        names: &[String],
        current: usize,
        clients: &[Xid],
        active: Option<Xid>,
    ) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atom(Atom::NetNumberOfDesktops),
            AtomEnum::CARDINAL,
            &[names.len() as u32],
        )?;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atom(Atom::NetCurrentDesktop),
            AtomEnum::CARDINAL,
            &[current as u32],
        )?;

        let joined = names.join("\0") + "\0";
        self.conn.change_property8(
            PropMode::REPLACE,
            self.root,
            self.atom(Atom::NetDesktopNames),
            self.atom(Atom::Utf8String),
            joined.as_bytes(),
        )?;

        let ids: Vec<u32> = clients.iter().map(|c| c.0).collect();
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atom(Atom::NetClientList),
            AtomEnum::WINDOW,
            &ids,
        )?;

        if let Some(active) = active {
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root,
                self.atom(Atom::NetActiveWindow),
                AtomEnum::WINDOW,
                &[active.0],
            )?;
        }
        Ok(())
    }
}

impl X11rbConn {
    fn key_name_for_keycode(&self, code: u8) -> Option<String> {
        let setup = self.conn.setup();
        let mapping = self
            .conn
            .get_keyboard_mapping(code, 1)
            .ok()?
            .reply()
            .ok()?;
        let sym = *mapping.keysyms.first()?;
        let _ = setup;
        crate::keysyms::XKeySym::iter().find_map(|k| (k.value() == sym).then(|| k.as_ref().to_string()))
    }
}
