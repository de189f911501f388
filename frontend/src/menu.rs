//! Paginated menu graph.
//!
//! Each menu owns an arena of entries linked by index in config order. The
//! visible page is the window of at most `max_buttons` entries starting at
//! `root_entry`. Back links between menus are plain indices set on submenu
//! entry, so the graph has no ownership cycles.

use std::path::PathBuf;

use thiserror::Error;

use crate::assets::{AssetLoader, TextStyle, TextureInfo};
use crate::command::Command;
use crate::config::Config;
use crate::geometry::{Geometry, Rect};

pub type EntryId = usize;
pub type MenuId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    #[error("menu '{0}' not found")]
    NotFound(String),
    #[error("menu '{0}' has no entries")]
    Empty(String),
}

#[derive(Debug)]
pub struct Entry {
    pub title: String,
    pub icon_path: Option<PathBuf>,
    pub icon_selected_path: Option<PathBuf>,
    pub command: Command,
    pub icon_rect: Rect,
    pub title_rect: Rect,
    /// Vertical shift that keeps a shrunken title centered on the title line.
    pub title_offset: i32,
    pub icon: Option<TextureInfo>,
    pub icon_selected: Option<TextureInfo>,
    pub title_texture: Option<TextureInfo>,
    next: Option<EntryId>,
    prev: Option<EntryId>,
}

impl Entry {
    fn new(title: String, icon_path: Option<PathBuf>, icon_selected_path: Option<PathBuf>, command: Command) -> Self {
        Self {
            title,
            icon_path,
            icon_selected_path,
            command,
            icon_rect: Rect::default(),
            title_rect: Rect::default(),
            title_offset: 0,
            icon: None,
            icon_selected: None,
            title_texture: None,
            next: None,
            prev: None,
        }
    }
}

#[derive(Debug)]
pub struct Menu {
    pub name: String,
    entries: Vec<Entry>,
    root_entry: EntryId,
    last_selected: EntryId,
    page: usize,
    highlight: usize,
    back: Option<MenuId>,
    rendered: bool,
}

impl Menu {
    fn new(name: String, entries: Vec<Entry>) -> Self {
        let mut menu = Self {
            name,
            entries,
            root_entry: 0,
            last_selected: 0,
            page: 0,
            highlight: 0,
            back: None,
            rendered: false,
        };
        let count = menu.entries.len();
        for (i, entry) in menu.entries.iter_mut().enumerate() {
            entry.prev = i.checked_sub(1);
            entry.next = (i + 1 < count).then_some(i + 1);
        }
        menu
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn back(&self) -> Option<MenuId> {
        self.back
    }

    /// Walk the entry links `count` times. `None` when the walk leaves the menu.
    pub fn advance(&self, from: EntryId, count: usize, direction: Direction) -> Option<EntryId> {
        let mut cur = from;
        self.entries.get(cur)?;
        for _ in 0..count {
            let entry = &self.entries[cur];
            cur = match direction {
                Direction::Next => entry.next?,
                Direction::Prev => entry.prev?,
            };
        }
        Some(cur)
    }

    pub fn total_pages(&self, page_size: usize) -> usize {
        self.entries.len().div_ceil(page_size)
    }

    /// Buttons on `page`: full pages except the trailing one, which holds the remainder.
    pub fn buttons_on_page(&self, page: usize, page_size: usize) -> usize {
        let total = self.entries.len();
        if total == 0 {
            return 0;
        }
        if page + 1 < self.total_pages(page_size) {
            page_size
        } else {
            match total % page_size {
                0 => page_size,
                rem => rem,
            }
        }
    }
}

pub struct MenuGraph {
    menus: Vec<Menu>,
    current: Option<MenuId>,
    geometry: Geometry,
    wrap: bool,
    title_style: Option<TextStyle>,
    highlight_rect: Rect,
}

impl MenuGraph {
    /// Build every configured menu. Entries with unparsable commands are
    /// dropped; a duplicated menu name keeps the first definition.
    pub fn from_config(config: &Config, geometry: Geometry, title_style: Option<TextStyle>) -> Self {
        let mut menus: Vec<Menu> = Vec::with_capacity(config.menus.len());
        for menu_cfg in &config.menus {
            if menus.iter().any(|m| m.name == menu_cfg.name) {
                log::warn!("Menu '{}' defined twice, ignoring the second definition", menu_cfg.name);
                continue;
            }
            let mut entries = Vec::with_capacity(menu_cfg.entries.len());
            for e in &menu_cfg.entries {
                match Command::parse(&e.command) {
                    Ok(command) => entries.push(Entry::new(
                        e.title.clone(),
                        e.icon.clone(),
                        e.icon_selected.clone(),
                        command,
                    )),
                    Err(err) => log::error!("Menu '{}', entry '{}': {}", menu_cfg.name, e.title, err),
                }
            }
            menus.push(Menu::new(menu_cfg.name.clone(), entries));
        }
        Self::new(menus, geometry, config.general.wrap_entries, title_style)
    }

    fn new(menus: Vec<Menu>, geometry: Geometry, wrap: bool, title_style: Option<TextStyle>) -> Self {
        Self { menus, current: None, geometry, wrap, title_style, highlight_rect: Rect::default() }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn menu_id(&self, name: &str) -> Option<MenuId> {
        self.menus.iter().position(|m| m.name == name)
    }

    pub fn menu(&self, id: MenuId) -> Option<&Menu> {
        self.menus.get(id)
    }

    pub fn current_id(&self) -> Option<MenuId> {
        self.current
    }

    pub fn current_menu(&self) -> Option<&Menu> {
        self.current.and_then(|id| self.menus.get(id))
    }

    pub fn load(
        &mut self,
        name: &str,
        set_back_link: bool,
        reset_position: bool,
        assets: &mut dyn AssetLoader,
    ) -> Result<(), MenuError> {
        let Some(id) = self.menu_id(name) else {
            log::error!("Menu '{}' not found", name);
            return Err(MenuError::NotFound(name.to_string()));
        };
        self.load_id(id, set_back_link, reset_position, assets)
    }

    pub fn load_id(
        &mut self,
        id: MenuId,
        set_back_link: bool,
        reset_position: bool,
        assets: &mut dyn AssetLoader,
    ) -> Result<(), MenuError> {
        let Some(target) = self.menus.get(id) else {
            log::error!("Menu #{} not found", id);
            return Err(MenuError::NotFound(format!("#{}", id)));
        };
        if target.entries.is_empty() {
            log::error!("Menu '{}' has no entries", target.name);
            return Err(MenuError::Empty(target.name.clone()));
        }

        let previous = self.current;
        if let Some(prev) = previous {
            if let Some(selected) = self.selected_id() {
                self.menus[prev].last_selected = selected;
            }
        }

        let page_size = self.geometry.max_buttons;
        let menu = &mut self.menus[id];
        if set_back_link {
            if let Some(prev) = previous.filter(|&p| p != id) {
                menu.back = Some(prev);
            }
        }

        let restored = if reset_position {
            None
        } else {
            let idx = menu.last_selected;
            menu.advance(0, (idx / page_size) * page_size, Direction::Next)
                .map(|root| (root, idx / page_size, idx % page_size))
        };
        let (root, page, highlight) = restored.unwrap_or((0, 0, 0));
        menu.root_entry = root;
        menu.page = page;
        menu.highlight = highlight;
        if reset_position {
            menu.last_selected = 0;
        }
        log::debug!("Loaded menu '{}' page {} highlight {}", menu.name, page, highlight);

        self.current = Some(id);
        self.ensure_rendered(id, assets);
        self.layout_page();
        Ok(())
    }

    /// Build icon and title textures the first time a menu is shown.
    fn ensure_rendered(&mut self, id: MenuId, assets: &mut dyn AssetLoader) {
        let title_style = self.title_style;
        let menu = &mut self.menus[id];
        if menu.rendered {
            return;
        }
        for entry in &mut menu.entries {
            if let Some(path) = &entry.icon_path {
                entry.icon = assets
                    .load_texture(path)
                    .map_err(|e| log::error!("Icon for '{}' failed to load: {}", entry.title, e))
                    .ok();
            }
            if let Some(path) = &entry.icon_selected_path {
                entry.icon_selected = assets
                    .load_texture(path)
                    .map_err(|e| log::error!("Selected icon for '{}' failed to load: {}", entry.title, e))
                    .ok();
            }
            if let Some(style) = &title_style {
                match assets.render_text(&entry.title, style) {
                    Ok(tex) => {
                        let line = assets.font_height(style.font) as i32;
                        entry.title_offset = (line - tex.height as i32).max(0) / 2;
                        entry.title_texture = Some(tex);
                    }
                    Err(e) => log::error!("Title '{}' failed to render: {}", entry.title, e),
                }
            }
        }
        menu.rendered = true;
    }

    /// Recompute icon/title rectangles for the visible page and the highlight.
    fn layout_page(&mut self) {
        let Some(id) = self.current else { return };
        let geometry = &self.geometry;
        let menu = &mut self.menus[id];
        let buttons = menu.buttons_on_page(menu.page, geometry.max_buttons);
        let mut cursor = Some(menu.root_entry);
        for slot in 0..buttons {
            let Some(eid) = cursor else { break };
            let entry = &mut menu.entries[eid];
            entry.icon_rect = geometry.icon_rect(slot, buttons);
            let (w, h) = entry.title_texture.map(|t| (t.width, t.height)).unwrap_or((0, 0));
            entry.title_rect = geometry.title_rect(entry.icon_rect, w, h, entry.title_offset);
            cursor = entry.next;
        }
        self.highlight_rect = geometry.highlight_rect(geometry.icon_rect(menu.highlight, buttons));
    }

    pub fn move_right(&mut self) -> bool {
        let Some(id) = self.current else { return false };
        let page_size = self.geometry.max_buttons;
        let advance = self.geometry.button_advance();
        let wrap = self.wrap;
        let menu = &mut self.menus[id];
        let buttons = menu.buttons_on_page(menu.page, page_size);

        if menu.highlight + 1 < buttons {
            menu.highlight += 1;
            self.highlight_rect = self.highlight_rect.shifted(advance);
            return true;
        }
        if menu.page + 1 < menu.total_pages(page_size) {
            let Some(root) = menu.advance(menu.root_entry, page_size, Direction::Next) else {
                log::error!("Menu '{}': next page walk left the entry list", menu.name);
                return false;
            };
            menu.root_entry = root;
            menu.page += 1;
            menu.highlight = 0;
            self.layout_page();
            return true;
        }
        if wrap && menu.entry_count() > 1 {
            menu.root_entry = 0;
            menu.page = 0;
            menu.highlight = 0;
            self.layout_page();
            return true;
        }
        false
    }

    pub fn move_left(&mut self) -> bool {
        let Some(id) = self.current else { return false };
        let page_size = self.geometry.max_buttons;
        let advance = self.geometry.button_advance();
        let wrap = self.wrap;
        let menu = &mut self.menus[id];

        if menu.highlight > 0 {
            menu.highlight -= 1;
            self.highlight_rect = self.highlight_rect.shifted(-advance);
            return true;
        }
        if menu.page > 0 {
            let Some(root) = menu.advance(menu.root_entry, page_size, Direction::Prev) else {
                log::error!("Menu '{}': previous page walk left the entry list", menu.name);
                return false;
            };
            menu.root_entry = root;
            menu.page -= 1;
            menu.highlight = menu.buttons_on_page(menu.page, page_size) - 1;
            self.layout_page();
            return true;
        }
        if wrap && menu.entry_count() > 1 {
            let last_page = menu.total_pages(page_size) - 1;
            let Some(root) = menu.advance(0, last_page * page_size, Direction::Next) else {
                log::error!("Menu '{}': last page walk left the entry list", menu.name);
                return false;
            };
            menu.root_entry = root;
            menu.page = last_page;
            menu.highlight = menu.buttons_on_page(last_page, page_size) - 1;
            self.layout_page();
            return true;
        }
        false
    }

    /// Move the highlight to `slot` on the current page (mouse hover).
    pub fn set_highlight(&mut self, slot: usize) -> bool {
        let Some(id) = self.current else { return false };
        let page_size = self.geometry.max_buttons;
        let advance = self.geometry.button_advance();
        let menu = &mut self.menus[id];
        if slot >= menu.buttons_on_page(menu.page, page_size) || slot == menu.highlight {
            return false;
        }
        let delta = slot as i32 - menu.highlight as i32;
        menu.highlight = slot;
        self.highlight_rect = self.highlight_rect.shifted(delta * advance);
        true
    }

    pub fn slot_at(&self, x: i32, y: i32) -> Option<usize> {
        self.visible().find(|(_, e)| e.icon_rect.contains(x, y)).map(|(slot, _)| slot)
    }

    pub fn selected_id(&self) -> Option<EntryId> {
        let menu = self.current_menu()?;
        menu.advance(menu.root_entry, menu.highlight, Direction::Next)
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        let id = self.selected_id()?;
        self.current_menu()?.entry(id)
    }

    pub fn page(&self) -> usize {
        self.current_menu().map(|m| m.page).unwrap_or(0)
    }

    pub fn highlight(&self) -> usize {
        self.current_menu().map(|m| m.highlight).unwrap_or(0)
    }

    pub fn highlight_rect(&self) -> Rect {
        self.highlight_rect
    }

    pub fn buttons_on_page(&self) -> usize {
        self.current_menu()
            .map(|m| m.buttons_on_page(m.page, self.geometry.max_buttons))
            .unwrap_or(0)
    }

    /// Entries on the visible page with their slot index, walking from `root_entry`.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Entry)> {
        let menu = self.current_menu();
        let buttons = self.buttons_on_page();
        let mut cursor = menu.map(|m| m.root_entry);
        (0..buttons).map_while(move |slot| {
            let m = menu?;
            let entry = m.entry(cursor?)?;
            cursor = entry.next;
            Some((slot, entry))
        })
    }

    pub fn has_more_left(&self) -> bool {
        self.page() > 0
    }

    pub fn has_more_right(&self) -> bool {
        self.current_menu()
            .map(|m| m.page + 1 < m.total_pages(self.geometry.max_buttons))
            .unwrap_or(false)
    }

    pub fn back_target(&self) -> Option<MenuId> {
        self.current_menu().and_then(|m| m.back)
    }

    /// Free every texture built for any menu.
    pub fn release(&mut self, assets: &mut dyn AssetLoader) {
        for menu in &mut self.menus {
            for entry in &mut menu.entries {
                for tex in [entry.icon.take(), entry.icon_selected.take(), entry.title_texture.take()]
                    .into_iter()
                    .flatten()
                {
                    assets.free(tex.id);
                }
            }
            menu.rendered = false;
        }
    }
}
